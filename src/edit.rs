//! State of an interactively editable variable.

use crate::tag::Tag;
use crate::variable::Constraint;

/// The tag of the synthetic `v == 0` constraint the solver added for an edit
/// variable, that constraint itself, and the last value suggested for it.
#[derive(Clone)]
pub(crate) struct EditInfo {
    pub tag: Tag,
    pub constraint: Constraint,
    pub constant: f64,
}
