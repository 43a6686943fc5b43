//! On-disk persistence (spec §6): a catalog of known plug-in libraries, an
//! index of known graphs, and one XML document per graph holding its
//! `GraphDescription`. A parse failure in one graph's file never prevents
//! the others from loading — each is isolated and reported back separately.

use std::path::{Path, PathBuf};

use purple_types::GraphId;
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceError;
use crate::graph::GraphDescription;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "catalog")]
pub struct Catalog {
    #[serde(rename = "library", default)]
    pub libraries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphIndexEntry {
    pub id: u64,
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "graph-index")]
pub struct GraphIndex {
    #[serde(rename = "graph", default)]
    pub graphs: Vec<GraphIndexEntry>,
}

pub fn load_catalog(path: &Path) -> Result<Catalog, PersistenceError> {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(Catalog::default());
    }
    quick_xml::de::from_str(&text).map_err(|e| PersistenceError::CatalogParse(e.to_string()))
}

pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<(), PersistenceError> {
    let text = quick_xml::se::to_string(catalog).map_err(|e| PersistenceError::CatalogParse(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| PersistenceError::CatalogParse(e.to_string()))
}

pub fn load_index(path: &Path) -> Result<GraphIndex, PersistenceError> {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(GraphIndex::default());
    }
    quick_xml::de::from_str(&text).map_err(|e| PersistenceError::IndexParse(e.to_string()))
}

pub fn save_index(path: &Path, index: &GraphIndex) -> Result<(), PersistenceError> {
    let text = quick_xml::se::to_string(index).map_err(|e| PersistenceError::IndexParse(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| PersistenceError::IndexParse(e.to_string()))
}

pub fn save_graph(path: &Path, description: &GraphDescription) -> Result<(), PersistenceError> {
    let text = quick_xml::se::to_string(description).map_err(|e| PersistenceError::GraphParse {
        graph: GraphId::new(description.id),
        detail: e.to_string(),
    })?;
    std::fs::write(path, text).map_err(|e| PersistenceError::GraphParse {
        graph: GraphId::new(description.id),
        detail: e.to_string(),
    })
}

fn load_graph_file(graph: GraphId, path: &Path) -> Result<GraphDescription, PersistenceError> {
    let text = std::fs::read_to_string(path).map_err(|e| PersistenceError::GraphParse {
        graph,
        detail: e.to_string(),
    })?;
    quick_xml::de::from_str(&text).map_err(|e| PersistenceError::GraphParse {
        graph,
        detail: e.to_string(),
    })
}

/// Loads every graph named in `index`, relative to `base`. A graph whose
/// file fails to parse is skipped rather than aborting the whole load; the
/// caller gets both the graphs that succeeded and the ones that didn't.
pub fn load_all(base: &Path, index: &GraphIndex) -> (Vec<GraphDescription>, Vec<(GraphId, PersistenceError)>) {
    let mut loaded = Vec::new();
    let mut failed = Vec::new();
    for entry in &index.graphs {
        let graph_id = GraphId::new(entry.id);
        let path: PathBuf = base.join(&entry.file);
        match load_graph_file(graph_id, &path) {
            Ok(description) => loaded.push(description),
            Err(err) => failed.push((graph_id, err)),
        }
    }
    (loaded, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{InputDescription, ModuleDescription, OutputDescription};

    #[test]
    fn round_trips_a_graph_description_through_xml() {
        let dir = tempdir::TempDir::new("purple-persistence").unwrap();
        let path = dir.path().join("graph-1.xml");
        let description = GraphDescription {
            id: 1,
            name: "scene".into(),
            modules: vec![ModuleDescription {
                id: 1,
                plugin: 2,
                dependencies: vec![],
                inputs: vec![InputDescription {
                    index: 0,
                    value_type: "Real64".into(),
                    value: "1.5".into(),
                }],
                outputs: vec![OutputDescription {
                    label: 0,
                    name: "anchor".into(),
                }],
            }],
        };
        save_graph(&path, &description).unwrap();
        let loaded = load_graph_file(GraphId::new(1), &path).unwrap();
        assert_eq!(loaded.name, "scene");
        assert_eq!(loaded.modules.len(), 1);
        assert_eq!(loaded.modules[0].inputs[0].value, "1.5");
        assert_eq!(loaded.modules[0].outputs[0].name, "anchor");
    }

    #[test]
    fn a_corrupt_graph_file_is_isolated_from_the_rest() {
        let dir = tempdir::TempDir::new("purple-persistence").unwrap();
        let good_path = dir.path().join("graph-1.xml");
        let bad_path = dir.path().join("graph-2.xml");
        save_graph(
            &good_path,
            &GraphDescription {
                id: 1,
                name: "good".into(),
                modules: vec![],
            },
        )
        .unwrap();
        std::fs::write(&bad_path, "<not-xml").unwrap();

        let index = GraphIndex {
            graphs: vec![
                GraphIndexEntry {
                    id: 1,
                    name: "good".into(),
                    file: "graph-1.xml".into(),
                },
                GraphIndexEntry {
                    id: 2,
                    name: "bad".into(),
                    file: "graph-2.xml".into(),
                },
            ],
        };
        let (loaded, failed) = load_all(dir.path(), &index);
        assert_eq!(loaded.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, GraphId::new(2));
    }

    #[test]
    fn missing_catalog_file_loads_as_empty() {
        let dir = tempdir::TempDir::new("purple-persistence").unwrap();
        let catalog = load_catalog(&dir.path().join("nonexistent.xml")).unwrap();
        assert!(catalog.libraries.is_empty());
    }
}
