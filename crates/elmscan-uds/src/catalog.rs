//! Per-brand module, DID and routine catalogs
//!
//! Catalog documents are YAML:
//!
//! ```yaml
//! brands:
//!   jeep:
//!     modules:
//!       - { name: bcm, tx_id: "620", rx_id: "504" }
//!     dids:
//!       - { did: "F1A0", name: Body Variant, decoder: ascii }
//!     routines:
//!       - { name: reset_tpms, routine_id: "0203" }
//! ```
//!
//! The `generic` brand always carries the standard identification DIDs and
//! the OBD engine/transmission addresses. Brand lookups fall back to it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::decoder::DidDecoder;
use crate::error::{parse_did, Result, UdsError};

pub const GENERIC_BRAND: &str = "generic";

/// Identification DIDs read by a quick UDS identification pass
pub const STANDARD_DID_KEYS: &[&str] = &["F190", "F187", "F188", "F189", "F18C"];

const BRAND_ALIASES: &[(&str, &str)] = &[
    ("chrysler", "jeep"),
    ("dodge", "jeep"),
    ("ram", "jeep"),
    ("land_rover", "landrover"),
    ("jaguar", "landrover"),
];

/// (did, name, decoder)
const STANDARD_DIDS: &[(&str, &str, &str)] = &[
    ("F180", "Boot Software ID", "ascii"),
    ("F181", "Application Software ID", "ascii"),
    ("F186", "Active Diagnostic Session", "uint"),
    ("F187", "Spare Part Number", "ascii"),
    ("F188", "ECU Software Number", "ascii"),
    ("F189", "ECU Software Version", "ascii"),
    ("F18A", "System Supplier ID", "ascii"),
    ("F18B", "ECU Manufacturing Date", "hex"),
    ("F18C", "ECU Serial Number", "ascii"),
    ("F190", "VIN", "ascii"),
    ("F191", "ECU Hardware Number", "ascii"),
    ("F192", "Supplier Hardware Number", "ascii"),
    ("F193", "Supplier Hardware Version", "ascii"),
    ("F194", "Supplier Software Number", "ascii"),
    ("F195", "Supplier Software Version", "ascii"),
    ("F197", "System Name", "ascii"),
];

/// (name, tx, rx)
const STANDARD_MODULES: &[(&str, &str, &str)] = &[
    ("generic_engine", "7E0", "7E8"),
    ("generic_transmission", "7E1", "7E9"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub tx_id: String,
    pub rx_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidEntry {
    pub did: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoder: Option<String>,
}

impl DidEntry {
    pub fn decoder(&self) -> DidDecoder {
        DidDecoder::from_tag(self.decoder.as_deref())
    }

    fn id(&self) -> Option<u16> {
        parse_did(&self.did).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineEntry {
    pub name: String,
    pub routine_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RoutineEntry {
    pub fn id(&self) -> Result<u16> {
        parse_did(&self.routine_id)
            .map_err(|_| UdsError::UnknownRoutine(format!("{} ({})", self.name, self.routine_id)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandCatalog {
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
    #[serde(default)]
    pub dids: Vec<DidEntry>,
    #[serde(default)]
    pub routines: Vec<RoutineEntry>,
}

impl BrandCatalog {
    fn merge(&mut self, other: BrandCatalog) {
        self.modules.extend(other.modules);
        self.dids.extend(other.dids);
        self.routines.extend(other.routines);
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    brands: BTreeMap<String, BrandCatalog>,
}

/// Lowercased brand with aliases resolved; empty means `generic`
pub fn normalize_brand(brand: &str) -> String {
    let key = brand
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_");
    if key.is_empty() {
        return GENERIC_BRAND.to_string();
    }
    BRAND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key)
}

/// All catalogs known to the client, keyed by normalized brand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSet {
    brands: BTreeMap<String, BrandCatalog>,
}

impl Default for CatalogSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogSet {
    /// Catalog set with only the built-in `generic` brand
    pub fn new() -> Self {
        let generic = BrandCatalog {
            modules: STANDARD_MODULES
                .iter()
                .map(|(name, tx, rx)| ModuleEntry {
                    name: name.to_string(),
                    tx_id: tx.to_string(),
                    rx_id: rx.to_string(),
                    description: None,
                })
                .collect(),
            dids: STANDARD_DIDS
                .iter()
                .map(|(did, name, decoder)| DidEntry {
                    did: did.to_string(),
                    name: name.to_string(),
                    decoder: Some(decoder.to_string()),
                })
                .collect(),
            routines: Vec::new(),
        };
        let mut brands = BTreeMap::new();
        brands.insert(GENERIC_BRAND.to_string(), generic);
        Self { brands }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut set = Self::new();
        set.load_yaml(yaml)?;
        Ok(set)
    }

    /// Merge a YAML document, returns the number of brands it named
    pub fn load_yaml(&mut self, yaml: &str) -> Result<usize> {
        let file: CatalogFile =
            serde_yaml::from_str(yaml).map_err(|e| UdsError::Catalog(e.to_string()))?;
        let count = file.brands.len();
        for (brand, catalog) in file.brands {
            let key = normalize_brand(&brand);
            debug!(
                brand = %key,
                modules = catalog.modules.len(),
                dids = catalog.dids.len(),
                routines = catalog.routines.len(),
                "Merging UDS catalog"
            );
            self.brands.entry(key).or_default().merge(catalog);
        }
        Ok(count)
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| UdsError::Catalog(format!("{}: {}", path.display(), e)))?;
        let count = self.load_yaml(&yaml)?;
        info!(path = %path.display(), brands = count, "Loaded UDS catalog");
        Ok(count)
    }

    pub fn brands(&self) -> Vec<&str> {
        self.brands.keys().map(String::as_str).collect()
    }

    pub fn brand(&self, brand: &str) -> Option<&BrandCatalog> {
        self.brands.get(&normalize_brand(brand))
    }

    /// The brand's catalog followed by `generic`
    fn search_order(&self, brand: &str) -> impl Iterator<Item = &BrandCatalog> {
        let key = normalize_brand(brand);
        let own = if key == GENERIC_BRAND {
            None
        } else {
            self.brands.get(&key)
        };
        own.into_iter().chain(self.brands.get(GENERIC_BRAND))
    }

    pub fn find_module(&self, brand: &str, name: &str) -> Option<&ModuleEntry> {
        self.search_order(brand)
            .find_map(|c| c.modules.iter().find(|m| m.name.eq_ignore_ascii_case(name.trim())))
    }

    pub fn find_did(&self, brand: &str, did: u16) -> Option<&DidEntry> {
        self.search_order(brand)
            .find_map(|c| c.dids.iter().find(|d| d.id() == Some(did)))
    }

    pub fn find_did_by_name(&self, brand: &str, name: &str) -> Option<&DidEntry> {
        self.search_order(brand)
            .find_map(|c| c.dids.iter().find(|d| d.name.eq_ignore_ascii_case(name.trim())))
    }

    pub fn find_routine(&self, brand: &str, name: &str) -> Option<&RoutineEntry> {
        self.search_order(brand).find_map(|c| {
            c.routines
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
        })
    }

    /// Built-in identification DIDs in [`STANDARD_DID_KEYS`] order
    pub fn standard_dids(&self) -> Vec<&DidEntry> {
        STANDARD_DID_KEYS
            .iter()
            .filter_map(|key| parse_did(key).ok())
            .filter_map(|did| self.find_did(GENERIC_BRAND, did))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const JEEP_YAML: &str = r#"
brands:
  Chrysler:
    modules:
      - { name: bcm, tx_id: "620", rx_id: "504" }
    dids:
      - { did: "F190", name: "VIN (BCM)", decoder: ascii }
      - { did: "2023", name: Odometer, decoder: uint }
    routines:
      - { name: reset_tpms, routine_id: "0203" }
"#;

    #[test]
    fn test_normalize_brand() {
        assert_eq!(normalize_brand("Dodge"), "jeep");
        assert_eq!(normalize_brand("RAM"), "jeep");
        assert_eq!(normalize_brand("Land Rover"), "landrover");
        assert_eq!(normalize_brand("jaguar"), "landrover");
        assert_eq!(normalize_brand("  "), "generic");
        assert_eq!(normalize_brand("Toyota"), "toyota");
    }

    #[test]
    fn test_builtin_generic() {
        let set = CatalogSet::new();
        assert_eq!(set.brands(), vec!["generic"]);
        let vin = set.find_did("generic", 0xF190).unwrap();
        assert_eq!(vin.name, "VIN");
        assert_eq!(vin.decoder(), DidDecoder::Ascii);
        let engine = set.find_module("anything", "generic_engine").unwrap();
        assert_eq!((engine.tx_id.as_str(), engine.rx_id.as_str()), ("7E0", "7E8"));

        let keys: Vec<&str> = set.standard_dids().iter().map(|d| d.did.as_str()).collect();
        assert_eq!(keys, STANDARD_DID_KEYS.to_vec());
    }

    #[test]
    fn test_yaml_merge_and_fallback() {
        let set = CatalogSet::from_yaml(JEEP_YAML).unwrap();
        assert_eq!(set.brands(), vec!["generic", "jeep"]);

        // Brand entries shadow generic ones
        assert_eq!(set.find_did("dodge", 0xF190).unwrap().name, "VIN (BCM)");
        assert_eq!(set.find_did("generic", 0xF190).unwrap().name, "VIN");
        // Falls back to generic
        assert_eq!(set.find_did("jeep", 0xF18C).unwrap().name, "ECU Serial Number");
        assert_eq!(set.find_did_by_name("jeep", "odometer").unwrap().did, "2023");
        assert_eq!(set.find_module("chrysler", "BCM").unwrap().rx_id, "504");
        assert_eq!(set.find_routine("jeep", "reset_tpms").unwrap().id().unwrap(), 0x0203);
        assert!(set.find_routine("generic", "reset_tpms").is_none());
        assert!(set.find_module("jeep", "abs").is_none());
    }

    #[test]
    fn test_invalid_yaml() {
        let mut set = CatalogSet::new();
        assert!(matches!(
            set.load_yaml("brands: [not, a, map]"),
            Err(UdsError::Catalog(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jeep.yaml");
        std::fs::write(&path, JEEP_YAML).unwrap();

        let mut set = CatalogSet::new();
        assert_eq!(set.load_file(&path).unwrap(), 1);
        assert!(set.brand("Jeep").is_some());
        assert!(matches!(
            set.load_file(dir.path().join("missing.yaml")),
            Err(UdsError::Catalog(_))
        ));
    }
}
