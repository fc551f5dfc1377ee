//! Node implementations for the expression DAG.
//!
//! - `leaf`: zero, exact integers, the division-by-zero sentinel
//! - `structural`: shift, negate, absolute value, addition, multiplication,
//!   integer powers
//! - `inv`: Newton reciprocal
//! - `sqrt`: Newton square root
//! - `exp_ln`: exponential and natural logarithm
//! - `trig`: sine, arctangent, arcsine and the derived cos/tan/acos
//! - `consts`: pi (Brent-Salamin) and e

pub mod consts;
pub mod exp_ln;
pub mod inv;
pub mod leaf;
pub mod sqrt;
pub mod structural;
pub mod trig;

pub use consts::{ENode, PiNode};
pub use exp_ln::{ExpNode, LnNode};
pub use inv::InvNode;
pub use leaf::{DivisionByZeroNode, IntNode, ZeroNode};
pub use sqrt::SqrtNode;
pub use structural::{AbsNode, AddNode, IntPowNode, MulNode, NegNode, ShiftNode};
pub use trig::{AcosNode, AsinNode, AtanNode, CosNode, SinNode, TanNode};
