pub mod decimal;
mod format;
pub mod host;
mod value;

pub use decimal::Decimal;
pub use format::{char_to_string, format_time_span, format_value};
pub use host::{Callable, DynamicObject, HostObject, NativeDelegate};
pub use value::{ArrayValue, Value, min_date_time};
