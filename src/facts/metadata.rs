//! Host metadata published below `trento/v0/hosts/<host>/metadata`

use super::paths::{METADATA_SAP_ENVIRONMENT, METADATA_SAP_LANDSCAPE, METADATA_SAP_SYSTEM};
use super::tree::{ToTree, Tree};

/// SAP grouping of a host
///
/// Unset fields are not written to the store at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostMetadata {
    pub sap_environment: Option<String>,
    pub sap_landscape: Option<String>,
    pub sap_system: Option<String>,
}

impl HostMetadata {
    /// Read the metadata back from a tree rooted at the metadata path
    pub fn from_tree(tree: &Tree) -> Self {
        let field = |key: &str| tree.get_str(key).map(str::to_string);

        Self {
            sap_environment: field(METADATA_SAP_ENVIRONMENT),
            sap_landscape: field(METADATA_SAP_LANDSCAPE),
            sap_system: field(METADATA_SAP_SYSTEM),
        }
    }
}

impl ToTree for HostMetadata {
    fn to_tree(&self) -> Tree {
        [
            (METADATA_SAP_ENVIRONMENT, &self.sap_environment),
            (METADATA_SAP_LANDSCAPE, &self.sap_landscape),
            (METADATA_SAP_SYSTEM, &self.sap_system),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key, Tree::leaf(v.as_str()))))
        .collect()
    }
}
