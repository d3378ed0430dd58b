use phf::phf_map;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AminoAcid {
    Alanine,
    Arginine,
    Asparagine,
    AsparticAcid,
    Cysteine,
    GlutamicAcid,
    Glutamine,
    Glycine,
    Histidine,
    Isoleucine,
    Leucine,
    Lysine,
    Methionine,
    Phenylalanine,
    Proline,
    Serine,
    Threonine,
    Tryptophan,
    Tyrosine,
    Valine,
}

static THREE_LETTER_CODES: phf::Map<&'static str, AminoAcid> = phf_map! {
    "ALA" => AminoAcid::Alanine,
    "ARG" => AminoAcid::Arginine,
    "ASN" => AminoAcid::Asparagine,
    "ASP" => AminoAcid::AsparticAcid,
    "CYS" => AminoAcid::Cysteine,
    "GLU" => AminoAcid::GlutamicAcid,
    "GLN" => AminoAcid::Glutamine,
    "GLY" => AminoAcid::Glycine,
    "HIS" => AminoAcid::Histidine,
    "ILE" => AminoAcid::Isoleucine,
    "LEU" => AminoAcid::Leucine,
    "LYS" => AminoAcid::Lysine,
    "MET" => AminoAcid::Methionine,
    "PHE" => AminoAcid::Phenylalanine,
    "PRO" => AminoAcid::Proline,
    "SER" => AminoAcid::Serine,
    "THR" => AminoAcid::Threonine,
    "TRP" => AminoAcid::Tryptophan,
    "TYR" => AminoAcid::Tyrosine,
    "VAL" => AminoAcid::Valine,
};

impl AminoAcid {
    pub const COUNT: usize = 20;

    pub const ALL: [AminoAcid; Self::COUNT] = [
        AminoAcid::Alanine,
        AminoAcid::Arginine,
        AminoAcid::Asparagine,
        AminoAcid::AsparticAcid,
        AminoAcid::Cysteine,
        AminoAcid::GlutamicAcid,
        AminoAcid::Glutamine,
        AminoAcid::Glycine,
        AminoAcid::Histidine,
        AminoAcid::Isoleucine,
        AminoAcid::Leucine,
        AminoAcid::Lysine,
        AminoAcid::Methionine,
        AminoAcid::Phenylalanine,
        AminoAcid::Proline,
        AminoAcid::Serine,
        AminoAcid::Threonine,
        AminoAcid::Tryptophan,
        AminoAcid::Tyrosine,
        AminoAcid::Valine,
    ];

    /// Dense index in `0..COUNT`, usable for per-type lookup tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn to_three_letter(self) -> &'static str {
        match self {
            AminoAcid::Alanine => "ALA",
            AminoAcid::Arginine => "ARG",
            AminoAcid::Asparagine => "ASN",
            AminoAcid::AsparticAcid => "ASP",
            AminoAcid::Cysteine => "CYS",
            AminoAcid::GlutamicAcid => "GLU",
            AminoAcid::Glutamine => "GLN",
            AminoAcid::Glycine => "GLY",
            AminoAcid::Histidine => "HIS",
            AminoAcid::Isoleucine => "ILE",
            AminoAcid::Leucine => "LEU",
            AminoAcid::Lysine => "LYS",
            AminoAcid::Methionine => "MET",
            AminoAcid::Phenylalanine => "PHE",
            AminoAcid::Proline => "PRO",
            AminoAcid::Serine => "SER",
            AminoAcid::Threonine => "THR",
            AminoAcid::Tryptophan => "TRP",
            AminoAcid::Tyrosine => "TYR",
            AminoAcid::Valine => "VAL",
        }
    }

    /// Number of backbone contacts a residue of this type can take part in at once.
    pub fn backbone_slots(self) -> i8 {
        if self == AminoAcid::Proline { 1 } else { 2 }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown amino acid code: '{0}'")]
pub struct ParseAminoAcidError(pub String);

impl FromStr for AminoAcid {
    type Err = ParseAminoAcidError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        THREE_LETTER_CODES
            .get(s.trim().to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| ParseAminoAcidError(s.to_string()))
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_three_letter())
    }
}

impl<'de> Deserialize<'de> for AminoAcid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_letter_codes_case_insensitively() {
        assert_eq!("ALA".parse::<AminoAcid>(), Ok(AminoAcid::Alanine));
        assert_eq!("trp".parse::<AminoAcid>(), Ok(AminoAcid::Tryptophan));
        assert_eq!(" Pro ".parse::<AminoAcid>(), Ok(AminoAcid::Proline));
    }

    #[test]
    fn rejects_unknown_codes() {
        let err = "XYZ".parse::<AminoAcid>().unwrap_err();
        assert_eq!(err, ParseAminoAcidError("XYZ".to_string()));
    }

    #[test]
    fn display_round_trips_through_from_str_for_all_types() {
        for acid in AminoAcid::ALL {
            assert_eq!(acid.to_string().parse::<AminoAcid>(), Ok(acid));
        }
    }

    #[test]
    fn indices_are_dense_and_ordered() {
        for (i, acid) in AminoAcid::ALL.iter().enumerate() {
            assert_eq!(acid.index(), i);
        }
    }

    #[test]
    fn proline_has_a_single_backbone_slot() {
        assert_eq!(AminoAcid::Proline.backbone_slots(), 1);
        assert_eq!(AminoAcid::Glycine.backbone_slots(), 2);
    }
}
