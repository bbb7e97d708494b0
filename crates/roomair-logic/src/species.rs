//! Species partitioning.
//!
//! A kinetics snapshot holds every state variable of the mechanism, not
//! only concentrations: photolysis and reaction rates, yields, surface
//! concentrations, deposition velocities and rate constants live there
//! too. Only real gas-phase species move between rooms.

use serde::{Deserialize, Serialize};

/// Suffix marking an outdoor concentration (`O3OUT` is outdoor `O3`).
pub const OUTDOOR_SUFFIX: &str = "OUT";

/// Constants, environment variables and rate coefficients of the mechanism.
pub const RESERVED_NAMES: &[&str] = &[
    "ACRate", "cosx", "secx", "M", "temp", "H2O", "PI", "AV", "adults", "children", "O2", "N2",
    "H2", "saero", "OH_reactivity", "OH_production", "KDI", "K8I", "FC9", "NC13", "NCD", "FC12",
    "KMT14", "CNO3", "KMT05", "F17", "K140", "KFPAN", "KPPNI", "K20", "KMT06", "KCH3O2", "K7I",
    "NC14", "NCPPN", "F3", "K10I", "KRD", "KR10", "NC1", "K3I", "NC17", "K12I", "NC4", "K14I",
    "K150", "K200", "F20", "KMT16", "K160", "F19", "KR7", "FC2", "F16", "N19", "KR3", "KMT20",
    "KHOCL", "F13", "KC0", "KMT04", "KRPPN", "F9", "K130", "KMT10", "KR19", "KMT02", "K4I",
    "KMT01", "FC14", "KR14", "NC7", "K170", "KBPPN", "K190", "NC3", "K15I", "KR15", "KCI",
    "FCPPN", "F15", "FC4", "KR12", "KMT17", "KR13", "K298CH3O2", "K80", "KMT19", "FC15", "K90",
    "K17I", "NC", "K20I", "F4", "K4", "N20", "KNO3AL", "KROSEC", "KNO3", "CCLNO3", "K70", "F8",
    "KRO2HO2", "FC20", "K14ISOM1", "KMT09", "FC16", "FPPN", "KROPRIM", "F12", "K19I", "NC8", "FCD",
    "KRO2NO3", "NC12", "KMT18", "KMT07", "FC3", "KRC", "F1", "FCC", "KR16", "CCLHO", "KMT13", "F10",
    "K100", "K40", "KCLNO3", "FC7", "F7", "FC", "NC10", "KR2", "FC17", "CN2O5", "KR4", "FC8",
    "KMT11", "KMT15", "KAPNO", "K1I", "KBPAN", "NC9", "FC19", "KMT03", "K3", "K16I", "KR20",
    "KPPN0", "F2", "K10", "FC1", "KR1", "KMT08", "KAPHO2", "KMT12", "F14", "KR17", "FC13", "KR8",
    "K2I", "K2", "FC10", "KDEC", "KD0", "NC16", "K13I", "KR9", "KN2O5", "K30", "K1", "K9I",
    "KRO2NO", "K120", "FD", "NC2", "NC15",
];

/// Transportable species of a snapshot, in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesPartition {
    pub indoor: Vec<String>,
    pub outdoor: Vec<String>,
}

impl SpeciesPartition {
    /// Indoor name of an outdoor species (`LIMONENEOUT` → `LIMONENE`).
    pub fn indoor_counterpart(outdoor: &str) -> Option<&str> {
        outdoor.strip_suffix(OUTDOOR_SUFFIX)
    }

    /// `(indoor, outdoor)` pairs whose indoor species is also transportable.
    pub fn paired(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.outdoor.iter().filter_map(move |out| {
            let indoor = Self::indoor_counterpart(out)?;
            self.indoor
                .iter()
                .any(|i| i == indoor)
                .then_some((indoor, out.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.indoor.is_empty() && self.outdoor.is_empty()
    }
}

/// Split state-variable names into transportable indoor and outdoor species.
pub fn partition_species<I, S>(names: I) -> SpeciesPartition
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut partition = SpeciesPartition::default();
    for name in names {
        let name = name.as_ref();
        if !is_transportable(name) {
            continue;
        }
        if name.ends_with(OUTDOOR_SUFFIX) {
            partition.outdoor.push(name.to_string());
        } else {
            partition.indoor.push(name.to_string());
        }
    }
    partition
}

/// Whether a state variable is a species that moves with the air.
pub fn is_transportable(name: &str) -> bool {
    !(is_surface(name)
        || prefixed_by_digit(name, 'J')
        || prefixed(name, "YIELD")
        || prefixed(name, "AV")
        || prefixed(name, "vd")
        || prefixed_by_digit(name, 'r')
        || RESERVED_NAMES.contains(&name))
}

// `XSURF`, not a bare `SURF`.
fn is_surface(name: &str) -> bool {
    name.len() > 4 && name.ends_with("SURF")
}

// Prefix followed by at least one more character.
fn prefixed(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len() && name.starts_with(prefix)
}

fn prefixed_by_digit(name: &str, first: char) -> bool {
    let mut chars = name.chars();
    chars.next() == Some(first) && chars.next().is_some_and(|c| c.is_ascii_digit())
}
