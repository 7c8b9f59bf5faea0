use std::io::ErrorKind;
use std::path::PathBuf;

use ipld_data_model::{Format, Link, Node};
use ipld_format_json::DagJson;
use ipld_selector::{LinkLoader, LoadError, Progress};

/// Loads link `X` from `<root>/X.json`.
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LinkLoader for DirLoader {
    fn load(&self, link: &Link, progress: &Progress) -> Result<Node, LoadError> {
        let cid = link.as_str();
        if cid.is_empty() || cid.contains(['/', '\\']) || cid.starts_with('.') {
            return Err(LoadError::NotFound(link.clone()));
        }
        let path = self.root.join(format!("{cid}.json"));
        log::debug!("reading {} for \"{}\"", path.display(), progress.path());

        let source = std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => LoadError::NotFound(link.clone()),
            _ => LoadError::Io {
                link: link.clone(),
                source,
            },
        })?;
        DagJson
            .decode(&source, &path.to_string_lossy())
            .map_err(|errors| LoadError::Decode {
                link: link.clone(),
                message: errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            })
    }
}
