//! Instruction set model: the operand domain and the raw descriptor records.

pub mod operand;
pub mod record;

pub use operand::{MaskSuffix, OperandType, RANK_ORDER};
pub use record::{DescriptorDatabase, InstructionForm, InstructionGroup, RawInstructionRecord};
