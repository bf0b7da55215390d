//! In-memory structure and confidence model (spec.md §3, §4.B).
//!
//! Holds the sequence, per-atom records, the pair-confidence (`PAE`) matrix
//! and per-residue `pLDDT`. Loaded once per chain and owned exclusively by
//! that chain's driver (spec.md §5 "Shared-resource policy").

use crate::error::StageError;
use crate::resid::ResId;

/// One atom record. Atom names and element symbols are preserved verbatim —
/// spec.md §4.B forbids generic placeholder names because the downstream
/// secondary-structure assigner (stage 11) requires real `N/CA/C/O` names.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub resid: ResId,
    pub atom_name: String,
    pub element: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Dense `N x N` predicted-aligned-error matrix. `pae[i][j]` is the expected
/// position error of residue `j+1` when residue `i+1` is held fixed
/// (0-indexed storage, 1-based `ResId` access via [`PaeMatrix::get`]).
#[derive(Debug, Clone)]
pub struct PaeMatrix {
    n: usize,
    values: Vec<f32>,
}

impl PaeMatrix {
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, StageError> {
        let n = rows.len();
        for row in &rows {
            if row.len() != n {
                return Err(StageError::InvariantViolation(
                    "PAE matrix must be square".to_string(),
                ));
            }
        }
        let mut values = Vec::with_capacity(n * n);
        for row in rows {
            values.extend(row);
        }
        Ok(Self { n, values })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// `pae[i,j]` for 1-based residue ids `i`, `j`.
    pub fn get(&self, i: ResId, j: ResId) -> f32 {
        let (i, j) = (i as usize - 1, j as usize - 1);
        self.values[i * self.n + j]
    }
}

/// Full per-chain structure.
#[derive(Debug, Clone)]
pub struct Structure {
    /// One-letter codes, index 0 == residue 1. `X` for unknown.
    seq: Vec<char>,
    atoms: Vec<Atom>,
    pae: Option<PaeMatrix>,
    /// Per-residue confidence, 0-100. Index 0 == residue 1.
    plddt: Vec<f64>,
}

impl Structure {
    pub fn new(seq: Vec<char>, atoms: Vec<Atom>) -> Result<Self, StageError> {
        let n = seq.len() as ResId;
        for atom in &atoms {
            if atom.resid == 0 || atom.resid > n {
                return Err(StageError::InvariantViolation(format!(
                    "atom residue id {} out of range [1,{n}]",
                    atom.resid
                )));
            }
        }
        Ok(Self {
            seq,
            atoms,
            pae: None,
            plddt: vec![0.0; seq_len_or(n)],
        })
    }

    pub fn n(&self) -> usize {
        self.seq.len()
    }

    pub fn seq(&self) -> &[char] {
        &self.seq
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn with_pae(mut self, pae: PaeMatrix) -> Result<Self, StageError> {
        if pae.n() != self.n() {
            return Err(StageError::InvariantViolation(format!(
                "PAE matrix size {} does not match sequence length {}",
                pae.n(),
                self.n()
            )));
        }
        self.pae = Some(pae);
        Ok(self)
    }

    pub fn with_plddt(mut self, plddt: Vec<f64>) -> Result<Self, StageError> {
        if plddt.len() != self.n() {
            return Err(StageError::InvariantViolation(format!(
                "pLDDT length {} does not match sequence length {}",
                plddt.len(),
                self.n()
            )));
        }
        self.plddt = plddt;
        Ok(self)
    }

    pub fn pae(&self) -> Option<&PaeMatrix> {
        self.pae.as_ref()
    }

    pub fn plddt(&self, resid: ResId) -> f64 {
        self.plddt[resid as usize - 1]
    }

    /// Residues with a complete backbone (`N, CA, C, O`) — "structured"
    /// residues per spec.md §3.
    pub fn structured_residues(&self) -> crate::resid::ResSet {
        let mut present: std::collections::HashMap<ResId, std::collections::HashSet<&str>> =
            std::collections::HashMap::new();
        for atom in &self.atoms {
            present
                .entry(atom.resid)
                .or_default()
                .insert(atom.atom_name.as_str());
        }
        const BACKBONE: [&str; 4] = ["N", "CA", "C", "O"];
        crate::resid::ResSet::from_ids(present.into_iter().filter_map(|(resid, names)| {
            BACKBONE.iter().all(|b| names.contains(b)).then_some(resid)
        }))
    }

    /// CA-CA Euclidean distance between two residues. `None` if either is
    /// missing a CA atom.
    pub fn ca_distance(&self, i: ResId, j: ResId) -> Option<f64> {
        let ca_i = self.ca_atom(i)?;
        let ca_j = self.ca_atom(j)?;
        Some(euclid(ca_i, ca_j))
    }

    fn ca_atom(&self, resid: ResId) -> Option<&Atom> {
        self.atoms
            .iter()
            .find(|a| a.resid == resid && a.atom_name == "CA")
    }

    /// Minimum inter-atomic distance between any atom of residue `i` and any
    /// atom of residue `j` (spec.md §4.O stage 21 structural connectivity).
    pub fn min_atom_distance(&self, i: ResId, j: ResId) -> Option<f64> {
        let atoms_i: Vec<&Atom> = self.atoms.iter().filter(|a| a.resid == i).collect();
        let atoms_j: Vec<&Atom> = self.atoms.iter().filter(|a| a.resid == j).collect();
        if atoms_i.is_empty() || atoms_j.is_empty() {
            return None;
        }
        let mut best = f64::INFINITY;
        for a in &atoms_i {
            for b in &atoms_j {
                let d = euclid(a, b);
                if d < best {
                    best = d;
                }
            }
        }
        Some(best)
    }

    /// Restrict to atoms belonging to `resids` (stage 20 EXTRACT_DOMAINS).
    pub fn subset(&self, resids: &crate::resid::ResSet) -> Structure {
        let atoms: Vec<Atom> = self
            .atoms
            .iter()
            .filter(|a| resids.contains(a.resid))
            .cloned()
            .collect();
        Structure {
            seq: self.seq.clone(),
            atoms,
            pae: self.pae.clone(),
            plddt: self.plddt.clone(),
        }
    }

    /// Canonical, deterministic PDB-style text serialization. Atom order is
    /// input order; atom names and element symbols are preserved verbatim.
    pub fn to_pdb_string(&self) -> String {
        let mut out = String::new();
        for (i, atom) in self.atoms.iter().enumerate() {
            out.push_str(&format!(
                "ATOM  {:>5} {:<4} {:<3} A{:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00          {:>2}\n",
                i + 1,
                pad_atom_name(&atom.atom_name),
                "RES",
                atom.resid,
                atom.x,
                atom.y,
                atom.z,
                atom.element,
            ));
        }
        out.push_str("END\n");
        out
    }

    /// Parse a (simplified) PDB `ATOM` record stream. Tolerates blank lines
    /// and non-`ATOM`/`TER`/`END` lines, per spec.md §4.C's general tolerance
    /// contract for tool-adjacent text formats.
    pub fn parse_pdb(text: &str) -> Result<Structure, StageError> {
        let mut atoms = Vec::new();
        let mut max_resid: ResId = 0;
        for line in text.lines() {
            if !line.starts_with("ATOM") && !line.starts_with("HETATM") {
                continue;
            }
            if line.len() < 54 {
                return Err(StageError::ParseError {
                    stage: "structure",
                    detail: format!("ATOM line too short: '{line}'"),
                });
            }
            let atom_name = line[12..16].trim().to_string();
            let resid: ResId = line[22..26]
                .trim()
                .parse()
                .map_err(|_| StageError::ParseError {
                    stage: "structure",
                    detail: format!("bad residue id in '{line}'"),
                })?;
            let x: f64 = line[30..38]
                .trim()
                .parse()
                .map_err(|_| StageError::ParseError {
                    stage: "structure",
                    detail: "bad x coordinate".to_string(),
                })?;
            let y: f64 = line[38..46]
                .trim()
                .parse()
                .map_err(|_| StageError::ParseError {
                    stage: "structure",
                    detail: "bad y coordinate".to_string(),
                })?;
            let z: f64 = line[46..54]
                .trim()
                .parse()
                .map_err(|_| StageError::ParseError {
                    stage: "structure",
                    detail: "bad z coordinate".to_string(),
                })?;
            let element = if line.len() >= 78 {
                line[76..78].trim().to_string()
            } else {
                element_from_atom_name(&atom_name)
            };
            max_resid = max_resid.max(resid);
            atoms.push(Atom {
                resid,
                atom_name,
                element,
                x,
                y,
                z,
            });
        }
        if atoms.is_empty() {
            return Err(StageError::ParseError {
                stage: "structure",
                detail: "no ATOM records found".to_string(),
            });
        }
        let seq = vec!['X'; max_resid as usize];
        Structure::new(seq, atoms)
    }
}

fn seq_len_or(n: ResId) -> usize {
    n as usize
}

fn euclid(a: &Atom, b: &Atom) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

fn pad_atom_name(name: &str) -> String {
    if name.len() >= 4 {
        name.to_string()
    } else if name.len() == 1 {
        format!(" {name}  ")
    } else {
        format!(" {name:<3}")
    }
}

fn element_from_atom_name(atom_name: &str) -> String {
    atom_name
        .chars()
        .find(|c| c.is_alphabetic())
        .map(|c| c.to_string())
        .unwrap_or_default()
}

/// Parse a pair-confidence matrix from a JSON array-of-arrays file
/// (spec.md §6 input format).
pub fn parse_pae_json(text: &str) -> Result<PaeMatrix, StageError> {
    let rows: Vec<Vec<f32>> =
        serde_json::from_str(text).map_err(|e| StageError::ParseError {
            stage: "pae",
            detail: e.to_string(),
        })?;
    PaeMatrix::from_rows(rows)
}
