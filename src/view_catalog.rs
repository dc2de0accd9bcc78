use std::collections::HashMap;
use std::path::Path;

use log::Level;
use serde::Deserialize;

use crate::error::{MarkerError, Result};
use crate::io::object_from_json;
use crate::observer::ImportObserver;

/// One image of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub file_name: String,
    pub view_id: u64,
}

#[derive(Deserialize)]
struct SfmViews {
    views: Vec<ViewRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewRecord {
    path: String,
    view_id: RawViewId,
}

/// The host writes ids as strings, hand-written files often use numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawViewId {
    Number(u64),
    Text(String),
}

impl RawViewId {
    fn to_u64(&self) -> Result<u64> {
        match self {
            RawViewId::Number(n) => Ok(*n),
            RawViewId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| MarkerError::Parse(format!("invalid viewId {:?}", s))),
        }
    }
}

/// Basename of a view path, accepting both separators.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Image basename to view id lookup, in the order views were first seen.
///
/// Two views with the same basename collapse into one entry: the later record
/// wins but the entry keeps the position of the first.
#[derive(Debug, Clone, Default)]
pub struct ViewCatalog {
    views: Vec<View>,
    by_name: HashMap<String, usize>,
}

impl ViewCatalog {
    /// Reads the `views` list of a scene description file.
    pub fn load<P: AsRef<Path>>(path: P, observer: &dyn ImportObserver) -> Result<ViewCatalog> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MarkerError::not_found("view data file", path));
        }
        let sfm: SfmViews = object_from_json(path)?;
        let mut catalog = ViewCatalog::default();
        for record in &sfm.views {
            let file_name = basename(&record.path);
            let view_id = record.view_id.to_u64()?;
            if let Some(replaced) = catalog.insert(file_name, view_id) {
                observer.log(
                    Level::Debug,
                    &format!("view {} replaces view {} for {}", view_id, replaced, file_name),
                );
            }
        }
        observer.log(Level::Info, &format!("Found {} view(s)", catalog.len()));
        Ok(catalog)
    }

    pub fn from_views<I, S>(views: I) -> ViewCatalog
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut catalog = ViewCatalog::default();
        for (name, view_id) in views {
            catalog.insert(name.as_ref(), view_id);
        }
        catalog
    }

    /// Returns the view id a same-named view held before.
    fn insert(&mut self, file_name: &str, view_id: u64) -> Option<u64> {
        if let Some(&idx) = self.by_name.get(file_name) {
            Some(std::mem::replace(&mut self.views[idx].view_id, view_id))
        } else {
            self.by_name.insert(file_name.to_string(), self.views.len());
            self.views.push(View {
                file_name: file_name.to_string(),
                view_id,
            });
            None
        }
    }

    pub fn get(&self, file_name: &str) -> Option<u64> {
        self.by_name.get(file_name).map(|&idx| self.views[idx].view_id)
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn view_ids(&self) -> Vec<u64> {
        self.views.iter().map(|v| v.view_id).collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
