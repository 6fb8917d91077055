// The trusted core: naturals, witnesses, streams and the induction layer.
// Nothing in here knows how certificates are emitted or stored.

pub mod induction;
pub mod natural;
pub mod stream;
pub mod witness;

pub use natural::{Integer, Natural, Peano};
pub use witness::{ConstraintError, Field, Witness, WitnessKind};
