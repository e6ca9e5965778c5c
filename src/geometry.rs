use crate::error::GutterError;
use crate::types::Pt;

/// Physical page layout in millimetres. Fixed for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub column_gap_mm: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self::new(210.0, 297.0, 25.0, 10.0)
    }

    pub fn new(
        page_width_mm: f32,
        page_height_mm: f32,
        margin_mm: f32,
        column_gap_mm: f32,
    ) -> Self {
        Self {
            page_width_mm,
            page_height_mm,
            margin_mm,
            column_gap_mm,
        }
    }

    pub fn content_width_mm(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    pub fn content_height_mm(&self) -> f32 {
        self.page_height_mm - 2.0 * self.margin_mm
    }

    pub fn column_width_mm(&self) -> f32 {
        (self.content_width_mm() - self.column_gap_mm) / 2.0
    }

    pub fn validate(&self) -> Result<(), GutterError> {
        let values = [
            ("page width", self.page_width_mm),
            ("page height", self.page_height_mm),
            ("margin", self.margin_mm),
            ("column gap", self.column_gap_mm),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(GutterError::InvalidGeometry(format!(
                    "{name} must be a non-negative finite length, got {value}"
                )));
            }
        }
        if self.content_height_mm() <= 0.0 {
            return Err(GutterError::InvalidGeometry(format!(
                "margins of {}mm leave no content height on a {}mm page",
                self.margin_mm, self.page_height_mm
            )));
        }
        if self.column_width_mm() <= 0.0 {
            return Err(GutterError::InvalidGeometry(format!(
                "no room for two columns: content width {}mm, gap {}mm",
                self.content_width_mm(),
                self.column_gap_mm
            )));
        }
        Ok(())
    }

    /// Converts to measurement units with the calibrated scale.
    pub fn resolve(&self, units_per_mm: f32) -> Result<ResolvedGeometry, GutterError> {
        self.validate()?;
        if !units_per_mm.is_finite() || units_per_mm <= 0.0 {
            return Err(GutterError::InvalidGeometry(format!(
                "calibration produced an unusable scale {units_per_mm}"
            )));
        }
        let to_units = |mm: f32| Pt::from_mm(mm, units_per_mm);
        let column_width = to_units(self.column_width_mm());
        let gap = to_units(self.column_gap_mm);
        let margin = to_units(self.margin_mm);
        Ok(ResolvedGeometry {
            physical: *self,
            units_per_mm,
            page_width: to_units(self.page_width_mm),
            page_height: to_units(self.page_height_mm),
            margin,
            content_width: to_units(self.content_width_mm()),
            content_height: to_units(self.content_height_mm()),
            column_width,
            column_x: [margin, margin + column_width + gap],
        })
    }
}

/// Page geometry in measurement units, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedGeometry {
    pub physical: PageGeometry,
    pub units_per_mm: f32,
    pub page_width: Pt,
    pub page_height: Pt,
    pub margin: Pt,
    pub content_width: Pt,
    pub content_height: Pt,
    pub column_width: Pt,
    /// Left edge of each column from the page's left edge.
    pub column_x: [Pt; 2],
}

impl ResolvedGeometry {
    pub fn content_top(&self) -> Pt {
        self.margin
    }
}
