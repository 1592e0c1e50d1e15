// This module turns the two free-text halves of a descriptor record into typed values. The
// descriptor normalizer parses the encoding half ("REX.W B8+r id") into an EncodingDescriptor
// and the operand expander parses the instruction half ("r32/m32, i8") into every concrete
// operand-type tuple it denotes. Both are pure functions of their input; unknown tokens are
// reported as ParseError and the table driver decides whether to skip the record or abort.

//! Encoding and operand syntax parsing.

pub mod descriptor;
pub mod operands;

pub use descriptor::{
    EncodingDescriptor, ImmediateMarker, LegacyPrefix, ModRm, OpcodeFold, OpcodeMap, PrefixSet,
    VectorFamily, VectorLength, VectorPrefix, VectorW,
};
pub use operands::expand_operands;
