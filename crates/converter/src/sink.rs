// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Persistence of finished graphs.

use crate::graph::LiveGraph;
use crate::ConvertError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a [`LiveGraph`] to durable storage in some target format.
pub trait ModelSink {
    /// Returns the sink's name (for logging).
    fn name(&self) -> &str;

    /// Writes `graph` to `output` and returns the number of bytes written.
    fn persist(&self, graph: &LiveGraph, output: &Path) -> Result<u64, ConvertError>;
}

/// Writes the graph, parameters included, as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink {
    pretty: bool,
}

impl JsonSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Reads a graph written by this sink.
    pub fn load(path: &Path) -> Result<LiveGraph, ConvertError> {
        let file = File::open(path).map_err(|e| persist_error(path, e))?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| persist_error(path, e))
    }
}

fn persist_error(path: &Path, e: impl std::fmt::Display) -> ConvertError {
    ConvertError::PersistError {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

impl ModelSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn persist(&self, graph: &LiveGraph, output: &Path) -> Result<u64, ConvertError> {
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| persist_error(output, e))?;
        }
        let file = File::create(output).map_err(|e| persist_error(output, e))?;
        let mut writer = BufWriter::new(file);
        let result = if self.pretty {
            serde_json::to_writer_pretty(&mut writer, graph)
        } else {
            serde_json::to_writer(&mut writer, graph)
        };
        result.map_err(|e| persist_error(output, e))?;
        writer.flush().map_err(|e| persist_error(output, e))?;

        let bytes = std::fs::metadata(output)
            .map_err(|e| persist_error(output, e))?
            .len();
        tracing::info!("wrote '{}' ({bytes} bytes)", output.display());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LiveLayer, PlainLayer};

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/model.json");
        let graph = LiveGraph::new(
            "tiny",
            vec![1.0, 2.5],
            vec![LiveLayer::PlainLeaf(PlainLayer {
                name: "Linear".into(),
                params: vec![],
            })],
        );

        let bytes = JsonSink::pretty().persist(&graph, &path).unwrap();
        assert!(bytes > 0);
        assert_eq!(JsonSink::load(&path).unwrap(), graph);
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonSink::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConvertError::PersistError { .. }));
    }
}
