//! Template length table (spec.md §4.D): `template_uid -> length`, used to
//! compute hit coverage and stage 23 `length_cov`.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::StageError;
use crate::hits::TemplateId;

#[derive(Debug, Default)]
pub struct TemplateLengths {
    by_uid: HashMap<TemplateId, usize>,
}

impl TemplateLengths {
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, StageError> {
        let mut by_uid = HashMap::new();
        for line in reader.lines() {
            let line = line.map_err(|e| StageError::ParseError {
                stage: "template_lengths",
                detail: e.to_string(),
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut cols = line.split_whitespace();
            let uid = cols.next().ok_or_else(|| StageError::ParseError {
                stage: "template_lengths",
                detail: format!("missing uid in '{line}'"),
            })?;
            let len: usize = cols
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| StageError::ParseError {
                    stage: "template_lengths",
                    detail: format!("missing/bad length in '{line}'"),
                })?;
            by_uid.insert(uid.to_string(), len);
        }
        Ok(Self { by_uid })
    }

    pub fn get(&self, template_uid: &str) -> Option<usize> {
        self.by_uid.get(template_uid).copied()
    }
}
