/// Build a dynamic SQL SET clause field-by-field.
///
/// When the `Option` is `Some`, boxes a clone of the value onto `values` and
/// appends `"column = ?N"` to `sets`, where `N` is the value's position.
/// Seed `values` with any leading parameters (e.g. `updated_at`) first.
///
/// ```ignore
/// let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];
/// let mut sets = vec!["updated_at = ?1".to_string()];
/// push_field!(input.description, "description", sets, values);
/// ```
#[macro_export]
macro_rules! push_field {
    ($field:expr, $col:literal, $sets:expr, $values:expr) => {
        if let Some(ref v) = $field {
            $values.push(Box::new(v.clone()) as Box<dyn rusqlite::types::ToSql>);
            $sets.push(format!("{} = ?{}", $col, $values.len()));
        }
    };
}
