//! JSON inputs handed over by the control loop

use anyhow::Context;
use lbsync_core::{Node, Service};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn read_service(path: &Path) -> anyhow::Result<Service> {
    read_json(path)
}

pub fn read_nodes(path: &Path) -> anyhow::Result<Vec<Node>> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_service_and_nodes() {
        let mut service = tempfile::NamedTempFile::new().unwrap();
        write!(
            service,
            r#"{{"namespace":"default","name":"web","uid":"abc","ports":[{{"port":80,"nodePort":30080}}]}}"#
        )
        .unwrap();
        let mut nodes = tempfile::NamedTempFile::new().unwrap();
        write!(
            nodes,
            r#"[{{"name":"10.0.0.1","labels":{{"kubernetes.io/role":"node"}}}}]"#
        )
        .unwrap();

        let service = read_service(service.path()).unwrap();
        assert_eq!(service.ports[0].protocol, "TCP");
        assert!(!service.has_session_affinity());

        let nodes = read_nodes(nodes.path()).unwrap();
        assert!(nodes[0].has_label("kubernetes.io/role", "node"));
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = read_nodes(Path::new("/nonexistent/nodes.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/nodes.json"));
    }
}
