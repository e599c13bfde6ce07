//! Built-in language plans.

pub mod c;
pub mod cpp;
pub mod java;
pub mod javascript;
pub mod python;

use crate::judge::plan::LanguagePlan;

/// Every plan shipped with codebox.
pub fn builtin() -> Vec<LanguagePlan> {
    vec![
        python::plan(),
        javascript::plan(),
        c::plan(),
        cpp::plan(),
        java::plan(),
    ]
}
