/// Add `column = ?N` to a [`SetClause`](crate::db::SetClause) when an `Option` field is `Some`.
///
/// The three-argument form binds a clone of the value; the closure form maps the
/// borrowed value first.
///
/// ```ignore
/// push_field!(update, input.notes, "notes");
/// push_field!(update, input.auto_switch, "auto_switch", |v| *v as i32);
/// ```
macro_rules! push_field {
    ($update:expr, $field:expr, $col:literal) => {
        if let Some(ref v) = $field {
            $update.push($col, v.clone());
        }
    };
    ($update:expr, $field:expr, $col:literal, |$v:ident| $map:expr) => {
        if let Some(ref $v) = $field {
            $update.push($col, $map);
        }
    };
}
