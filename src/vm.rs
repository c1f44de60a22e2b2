//! Binding of raw VM arguments to typed calls.
//!
//! The VM hands a native function one variable address per parameter, followed by one length
//! per vector template group. `Call::bind` checks the arity and that every address (or address
//! range) lies inside the VM variable space, once, before anything is read or written.

use std::{
    error::Error,
    fmt::{self, Display},
    ops::Range,
};

use crate::catalog::{Native, Slot};

/// Errors produced while binding raw VM arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindErr {
    Arity {
        native: &'static str,
        got: usize,
        expected: usize,
    },
    OutOfMemoryRange {
        addr: usize,
        len: usize,
        memory: usize,
    },
}

impl Display for BindErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindErr::Arity {
                native,
                got,
                expected,
            } => write!(f, "{native} takes {expected} arguments, got {got}"),
            BindErr::OutOfMemoryRange { addr, len, memory } => write!(
                f,
                "variables {addr}..{} are outside the {memory} VM variables",
                addr + len
            ),
        }
    }
}

impl Error for BindErr {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Scalar(usize),
    Vector(Range<usize>),
}

/// A native call whose arguments are resolved to VM variable addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetError {
        error: usize,
    },
    ResetError,
    Init {
        input_count: usize,
        output_counts: Range<usize>,
        activations: Range<usize>,
    },
    Free,
    Reset,
    Clear,
    GetWeight {
        layer: usize,
        input: usize,
        output: usize,
        num: usize,
        den: usize,
    },
    SetWeight {
        layer: usize,
        input: usize,
        output: usize,
        num: usize,
        den: usize,
    },
    GetWeights {
        layer: usize,
        num: Range<usize>,
        den: Range<usize>,
    },
    SetWeights {
        layer: usize,
        num: Range<usize>,
        den: Range<usize>,
    },
    GetOffset {
        layer: usize,
        index: usize,
        num: usize,
        den: usize,
    },
    SetOffset {
        layer: usize,
        index: usize,
        num: usize,
        den: usize,
    },
    GetOffsets {
        layer: usize,
        num: Range<usize>,
        den: Range<usize>,
    },
    SetOffsets {
        layer: usize,
        num: Range<usize>,
        den: Range<usize>,
    },
    GetInputs {
        inputs: Range<usize>,
    },
    SetInputs {
        inputs: Range<usize>,
    },
    GetOutputs {
        outputs: Range<usize>,
    },
    SetOutputs {
        outputs: Range<usize>,
    },
    Eval,
    Reinforce {
        alpha_num: usize,
        alpha_den: usize,
    },
    Backprop {
        eta_num: usize,
        eta_den: usize,
    },
    DatasetInit {
        max: usize,
    },
    DatasetAdd {
        input: Range<usize>,
        output: Range<usize>,
    },
    BackpropDataset {
        eta_num: usize,
        eta_den: usize,
        iterations: usize,
    },
}

impl Call {
    /// Binds the raw arguments of a native call.
    ///
    /// # Arguments
    /// * `native` - The function being called.
    /// * `raw` - One address per parameter followed by one length per template group.
    /// * `memory` - The amount of VM variables.
    ///
    /// # Returns
    /// The typed call, or an error if the arity is wrong or an address is out of memory.
    pub fn bind(native: Native, raw: &[u16], memory: usize) -> Result<Self, BindErr> {
        let params = native.params();
        let expected = params.len() + native.groups();
        if raw.len() != expected {
            return Err(BindErr::Arity {
                native: native.name(),
                got: raw.len(),
                expected,
            });
        }

        let (addrs, lengths) = raw.split_at(params.len());
        let operands = params
            .iter()
            .zip(addrs)
            .map(|(param, &addr)| {
                let addr = addr as usize;
                let len = match param.slot {
                    Slot::Scalar => 1,
                    Slot::Vector(group) => lengths
                        .get((group as usize).saturating_sub(1))
                        .map_or(0, |&len| len as usize),
                };

                if addr + len > memory {
                    return Err(BindErr::OutOfMemoryRange { addr, len, memory });
                }

                Ok(match param.slot {
                    Slot::Scalar => Operand::Scalar(addr),
                    Slot::Vector(_) => Operand::Vector(addr..addr + len),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_operands(native, operands).ok_or(BindErr::Arity {
            native: native.name(),
            got: raw.len(),
            expected,
        })
    }

    fn from_operands(native: Native, operands: Vec<Operand>) -> Option<Self> {
        use Operand::{Scalar as S, Vector as V};

        let call = match (native, operands.as_slice()) {
            (Native::GetError, [S(error)]) => Call::GetError { error: *error },
            (Native::ResetError, []) => Call::ResetError,
            (Native::Init, [S(input_count), V(output_counts), V(activations)]) => Call::Init {
                input_count: *input_count,
                output_counts: output_counts.clone(),
                activations: activations.clone(),
            },
            (Native::Free, []) => Call::Free,
            (Native::Reset, []) => Call::Reset,
            (Native::Clear, []) => Call::Clear,
            (Native::GetWeight, [S(layer), S(input), S(output), S(num), S(den)]) => {
                Call::GetWeight {
                    layer: *layer,
                    input: *input,
                    output: *output,
                    num: *num,
                    den: *den,
                }
            }
            (Native::SetWeight, [S(layer), S(input), S(output), S(num), S(den)]) => {
                Call::SetWeight {
                    layer: *layer,
                    input: *input,
                    output: *output,
                    num: *num,
                    den: *den,
                }
            }
            (Native::GetWeights, [S(layer), V(num), V(den)]) => Call::GetWeights {
                layer: *layer,
                num: num.clone(),
                den: den.clone(),
            },
            (Native::SetWeights, [S(layer), V(num), V(den)]) => Call::SetWeights {
                layer: *layer,
                num: num.clone(),
                den: den.clone(),
            },
            (Native::GetOffset, [S(layer), S(index), S(num), S(den)]) => Call::GetOffset {
                layer: *layer,
                index: *index,
                num: *num,
                den: *den,
            },
            (Native::SetOffset, [S(layer), S(index), S(num), S(den)]) => Call::SetOffset {
                layer: *layer,
                index: *index,
                num: *num,
                den: *den,
            },
            (Native::GetOffsets, [S(layer), V(num), V(den)]) => Call::GetOffsets {
                layer: *layer,
                num: num.clone(),
                den: den.clone(),
            },
            (Native::SetOffsets, [S(layer), V(num), V(den)]) => Call::SetOffsets {
                layer: *layer,
                num: num.clone(),
                den: den.clone(),
            },
            (Native::GetInputs, [V(inputs)]) => Call::GetInputs {
                inputs: inputs.clone(),
            },
            (Native::SetInputs, [V(inputs)]) => Call::SetInputs {
                inputs: inputs.clone(),
            },
            (Native::GetOutputs, [V(outputs)]) => Call::GetOutputs {
                outputs: outputs.clone(),
            },
            (Native::SetOutputs, [V(outputs)]) => Call::SetOutputs {
                outputs: outputs.clone(),
            },
            (Native::Eval, []) => Call::Eval,
            (Native::Reinforce, [S(alpha_num), S(alpha_den)]) => Call::Reinforce {
                alpha_num: *alpha_num,
                alpha_den: *alpha_den,
            },
            (Native::Backprop, [S(eta_num), S(eta_den)]) => Call::Backprop {
                eta_num: *eta_num,
                eta_den: *eta_den,
            },
            (Native::DatasetInit, [S(max)]) => Call::DatasetInit { max: *max },
            (Native::DatasetAdd, [V(input), V(output)]) => Call::DatasetAdd {
                input: input.clone(),
                output: output.clone(),
            },
            (Native::BackpropDataset, [S(eta_num), S(eta_den), S(iterations)]) => {
                Call::BackpropDataset {
                    eta_num: *eta_num,
                    eta_den: *eta_den,
                    iterations: *iterations,
                }
            }
            _ => return None,
        };

        Some(call)
    }

    /// The native function this call invokes.
    pub fn native(&self) -> Native {
        match self {
            Call::GetError { .. } => Native::GetError,
            Call::ResetError => Native::ResetError,
            Call::Init { .. } => Native::Init,
            Call::Free => Native::Free,
            Call::Reset => Native::Reset,
            Call::Clear => Native::Clear,
            Call::GetWeight { .. } => Native::GetWeight,
            Call::SetWeight { .. } => Native::SetWeight,
            Call::GetWeights { .. } => Native::GetWeights,
            Call::SetWeights { .. } => Native::SetWeights,
            Call::GetOffset { .. } => Native::GetOffset,
            Call::SetOffset { .. } => Native::SetOffset,
            Call::GetOffsets { .. } => Native::GetOffsets,
            Call::SetOffsets { .. } => Native::SetOffsets,
            Call::GetInputs { .. } => Native::GetInputs,
            Call::SetInputs { .. } => Native::SetInputs,
            Call::GetOutputs { .. } => Native::GetOutputs,
            Call::SetOutputs { .. } => Native::SetOutputs,
            Call::Eval => Native::Eval,
            Call::Reinforce { .. } => Native::Reinforce,
            Call::Backprop { .. } => Native::Backprop,
            Call::DatasetInit { .. } => Native::DatasetInit,
            Call::DatasetAdd { .. } => Native::DatasetAdd,
            Call::BackpropDataset { .. } => Native::BackpropDataset,
        }
    }
}

/// Reads the variable at `addr`.
pub fn read(vars: &[i16], addr: usize) -> Result<i16, BindErr> {
    vars.get(addr).copied().ok_or(BindErr::OutOfMemoryRange {
        addr,
        len: 1,
        memory: vars.len(),
    })
}

/// Writes `value` into the variable at `addr`.
pub fn write(vars: &mut [i16], addr: usize, value: i16) -> Result<(), BindErr> {
    let memory = vars.len();
    let var = vars.get_mut(addr).ok_or(BindErr::OutOfMemoryRange {
        addr,
        len: 1,
        memory,
    })?;

    *var = value;
    Ok(())
}

/// Borrows the variables in `range`.
pub fn slice<'a>(vars: &'a [i16], range: &Range<usize>) -> Result<&'a [i16], BindErr> {
    vars.get(range.clone()).ok_or(BindErr::OutOfMemoryRange {
        addr: range.start,
        len: range.len(),
        memory: vars.len(),
    })
}

/// Mutably borrows the variables in `range`.
pub fn slice_mut<'a>(
    vars: &'a mut [i16],
    range: &Range<usize>,
) -> Result<&'a mut [i16], BindErr> {
    let memory = vars.len();
    vars.get_mut(range.clone()).ok_or(BindErr::OutOfMemoryRange {
        addr: range.start,
        len: range.len(),
        memory,
    })
}
