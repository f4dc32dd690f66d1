// Resource names of the form "{collection}/{id}".
use crate::core::error::{Error, ErrorKind};

pub fn format_name(collection: &str, id: u64) -> String {
    format!("{collection}/{id}")
}

/// Resolves `name` to the numeric id it embeds.
///
/// A name without the collection prefix, or with nothing after it, is an
/// `InvalidArgument`. A well-formed name whose id is not a canonical number
/// (`tasks/abc`, `tasks/007`) can never resolve to a record and is reported
/// as `NotFound`.
pub fn parse_name(name: &str, collection: &str, singular: &str) -> Result<u64, Error> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("{singular} name is required")));
    }
    let id = name
        .strip_prefix(collection)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message(format!(
                    "{singular} name must have format \"{collection}/{{{singular}}}\""
                ))
                .with_name(name)
        })?;
    match id.parse::<u64>() {
        Ok(id) if format_name(collection, id) == name => Ok(id),
        _ => Err(not_found(singular, name)),
    }
}

pub fn not_found(singular: &str, name: &str) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message(format!("{singular} does not exist"))
        .with_name(name)
}

#[cfg(test)]
mod tests {
    use super::{format_name, parse_name};
    use crate::core::error::ErrorKind;

    #[test]
    fn formats_collection_and_id() {
        assert_eq!(format_name("tasks", 12), "tasks/12");
    }

    #[test]
    fn parses_embedded_id() {
        assert_eq!(parse_name("tasks/12", "tasks", "task").expect("id"), 12);
    }

    #[test]
    fn empty_name_is_invalid() {
        let err = parse_name("", "tasks", "task").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), Some("task name is required"));
    }

    #[test]
    fn wrong_prefix_is_invalid() {
        for name in ["projects/1", "tasks", "tasks/", "tasks1", "/tasks/1"] {
            let err = parse_name(name, "tasks", "task").expect_err("err");
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{name}");
        }
    }

    #[test]
    fn non_numeric_id_is_not_found() {
        let err = parse_name("tasks/abc", "tasks", "task").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.name(), Some("tasks/abc"));
    }

    #[test]
    fn non_canonical_id_is_not_found() {
        for name in ["tasks/007", "tasks/+7"] {
            let err = parse_name(name, "tasks", "task").expect_err("err");
            assert_eq!(err.kind(), ErrorKind::NotFound, "{name}");
        }
    }
}
