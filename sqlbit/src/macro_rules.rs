
/// Maps a single-field newtype onto the column type of its inner value.
#[macro_export]
macro_rules! impl_sql_value_newtype {
    ($New:ident, $Inner:ty) => {
        impl $crate::SqlValue for $New {
            fn native_type() -> $crate::NativeType {
                <$Inner as $crate::SqlValue>::native_type()
            }
            fn into_value(self) -> Result<$crate::Value, $crate::OrmError> {
                <$Inner as $crate::SqlValue>::into_value(self.0)
            }
            fn from_value(value: $crate::Value) -> Result<Self, $crate::OrmError> {
                <$Inner as $crate::SqlValue>::from_value(value).map($New)
            }
        }
    };
}

// Accessor boilerplate for TypeDescriptorBuilder

#[macro_export]
macro_rules! primary_key {
    ($builder:expr, $Owner:ty, $field:ident) => {
        $builder.primary_key(stringify!($field), |e: &$Owner| e.$field.clone(), |e: &mut $Owner, v| e.$field = v)
    };
}

#[macro_export]
macro_rules! column {
    ($builder:expr, $Owner:ty, $field:ident) => {
        $builder.column(stringify!($field), |e: &$Owner| e.$field.clone(), |e: &mut $Owner, v| e.$field = v)
    };
}

#[macro_export]
macro_rules! composite {
    ($builder:expr, $Owner:ty, $field:ident) => {
        $builder.composite(stringify!($field), |e: &$Owner| &e.$field, |e: &mut $Owner| &mut e.$field)
    };
}

#[macro_export]
macro_rules! vector {
    ($builder:expr, $Owner:ty, $field:ident) => {
        $builder.vector(stringify!($field), |e: &$Owner| &e.$field, |e: &mut $Owner| &mut e.$field)
    };
}

#[macro_export]
macro_rules! external {
    ($builder:expr, $Owner:ty, $field:ident, $codec:expr) => {
        $builder.external(stringify!($field), $codec, |e: &$Owner| &e.$field, |e: &mut $Owner, v| e.$field = v)
    };
}

/// Builds a descriptor from `kind field` pairs in declaration order,
/// kinds being `pk`, `column`, `composite` and `vector`.
#[macro_export]
macro_rules! describe {
    (@field $b:expr, $Owner:ty, pk $field:ident) => { $crate::primary_key!($b, $Owner, $field) };
    (@field $b:expr, $Owner:ty, column $field:ident) => { $crate::column!($b, $Owner, $field) };
    (@field $b:expr, $Owner:ty, composite $field:ident) => { $crate::composite!($b, $Owner, $field) };
    (@field $b:expr, $Owner:ty, vector $field:ident) => { $crate::vector!($b, $Owner, $field) };
    ($Owner:ty, $type_name:expr, $table:expr, { $($kind:ident $field:ident),* $(,)? }) => {{
        let builder = $crate::TypeDescriptor::builder::<$Owner>($type_name, $table);
        $( let builder = $crate::describe!(@field builder, $Owner, $kind $field); )*
        builder
    }};
}
