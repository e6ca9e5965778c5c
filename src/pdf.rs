use crate::error::GutterError;
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};

/// One rasterized page, JPEG-encoded.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

fn lopdf_err(err: lopdf::Error) -> GutterError {
    GutterError::Render {
        page: 0,
        message: format!("pdf assembly error: {err}"),
    }
}

/// Builds a PDF with one page per image, each image stretched over a
/// `page_width_pt` x `page_height_pt` media box.
pub fn assemble_pdf(
    images: &[PageImage],
    page_width_pt: f32,
    page_height_pt: f32,
) -> Result<Vec<u8>, GutterError> {
    if images.is_empty() {
        return Err(GutterError::Render {
            page: 0,
            message: "no pages to assemble".to_string(),
        });
    }
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<LoObject> = Vec::with_capacity(images.len());

    for (idx, image) in images.iter().enumerate() {
        if image.width_px == 0 || image.height_px == 0 || image.jpeg.is_empty() {
            return Err(GutterError::Render {
                page: idx + 1,
                message: "empty page image".to_string(),
            });
        }
        // already DCT-encoded; keep lopdf from deflating it again
        let image_id = doc.add_object(
            LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width_px as i64,
                    "Height" => image.height_px as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                image.jpeg.clone(),
            )
            .with_compression(false),
        );
        let content = format!(
            "q {:.3} 0 0 {:.3} 0 0 cm /Im1 Do Q\n",
            page_width_pt, page_height_pt
        )
        .into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
            "MediaBox" => vec![
                0.into(),
                0.into(),
                LoObject::Real(page_width_pt),
                LoObject::Real(page_height_pt),
            ],
        });
        kids.push(LoObject::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => images.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| GutterError::Render {
        page: 0,
        message: format!("pdf write failed: {e}"),
    })?;
    Ok(out)
}

/// Page count of an assembled PDF.
pub fn page_count(pdf: &[u8]) -> Result<usize, GutterError> {
    let doc = LoDocument::load_mem(pdf).map_err(lopdf_err)?;
    Ok(doc.get_pages().len())
}
