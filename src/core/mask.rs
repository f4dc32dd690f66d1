// Update-mask resolution shared by the update operations.
use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};

const WILDCARD: &str = "*";

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct UpdateMask {
    pub paths: Vec<String>,
}

impl UpdateMask {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all() -> Self {
        Self::new([WILDCARD])
    }
}

/// Fields a resource exposes to update masks.
#[derive(Clone, Copy, Debug)]
pub struct FieldSet {
    pub updatable: &'static [&'static str],
    pub immutable: &'static [&'static str],
}

impl FieldSet {
    /// Resolves `mask` to the updatable fields it selects.
    ///
    /// An empty mask selects the fields the patch actually sets (`present`);
    /// a lone `*` selects every updatable field.
    pub fn resolve(
        &self,
        mask: &UpdateMask,
        present: &[&'static str],
    ) -> Result<Vec<&'static str>, Error> {
        match mask.paths.as_slice() {
            [] => return Ok(present.to_vec()),
            [only] if only == WILDCARD => return Ok(self.updatable.to_vec()),
            _ => {}
        }
        let mut fields = Vec::with_capacity(mask.paths.len());
        for path in &mask.paths {
            if path == WILDCARD {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message("a wildcard must be the only path in the update mask"));
            }
            if self.immutable.contains(&path.as_str()) {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message(format!("field {path:?} cannot be updated")));
            }
            let Some(field) = self.updatable.iter().find(|field| **field == path) else {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message(format!("update mask names unknown field {path:?}")));
            };
            if !fields.contains(field) {
                fields.push(*field);
            }
        }
        Ok(fields)
    }
}
