//! ECOD hierarchy table (spec.md §4.D): `uid, short_id, x.h, h.t, x.h.t.f`,
//! roughly 900k rows in production reference data.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::StageError;
use crate::hits::TemplateId;

/// One row of the ECOD hierarchy table.
#[derive(Debug, Clone)]
pub struct HierarchyRow {
    pub uid: TemplateId,
    pub short_id: String,
    /// `x.h` column — the h-group path, e.g. `"2002"`.
    pub h_group: String,
    /// `h.t` column — the t-group path, e.g. `"2002.1"`.
    pub t_group: String,
    /// `x.h.t.f` column — full hierarchical path.
    pub full_path: String,
}

/// Eagerly-loaded, read-only ECOD hierarchy index, keyed by template uid.
///
/// Reference data is immutable after load and shared across chains in a
/// batch (spec.md §5); this type is cheap to share behind an `Arc` or plain
/// borrow since nothing ever mutates it post-construction.
#[derive(Debug, Default)]
pub struct EcodHierarchy {
    by_uid: HashMap<TemplateId, HierarchyRow>,
}

impl EcodHierarchy {
    /// Parse the tab-separated hierarchy table. Tolerates blank lines and a
    /// leading header line (spec.md §4.C tolerance contract).
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, StageError> {
        let mut by_uid = HashMap::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| StageError::ParseError {
                stage: "hierarchy",
                detail: e.to_string(),
            })?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 5 {
                if lineno == 0 {
                    // Tolerate a header row that doesn't split into 5 tab
                    // fields (e.g. space-padded column titles).
                    continue;
                }
                return Err(StageError::ParseError {
                    stage: "hierarchy",
                    detail: format!("expected 5 columns, got {}: '{line}'", cols.len()),
                });
            }
            let row = HierarchyRow {
                uid: cols[0].to_string(),
                short_id: cols[1].to_string(),
                h_group: cols[2].to_string(),
                t_group: cols[3].to_string(),
                full_path: cols[4].to_string(),
            };
            by_uid.insert(row.uid.clone(), row);
        }
        Ok(Self { by_uid })
    }

    pub fn lookup(&self, template_uid: &str) -> Option<&HierarchyRow> {
        self.by_uid.get(template_uid)
    }

    pub fn len(&self) -> usize {
        self.by_uid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uid.is_empty()
    }
}
