/// The kind of VM argument a parameter takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A single variable.
    Scalar,
    /// A run of variables, vectors of the same template group share their length.
    Vector(u8),
}

/// A named parameter of a native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub slot: Slot,
}

const fn scalar(name: &'static str) -> Param {
    Param {
        name,
        slot: Slot::Scalar,
    }
}

const fn vector(name: &'static str, group: u8) -> Param {
    Param {
        name,
        slot: Slot::Vector(group),
    }
}

static GET_ERROR: [Param; 1] = [scalar("error")];
static INIT: [Param; 3] = [
    scalar("input count"),
    vector("output count of each layer", 1),
    vector("activation of each layer", 1),
];
static WEIGHT: [Param; 5] = [
    scalar("layer"),
    scalar("input"),
    scalar("output"),
    scalar("num"),
    scalar("den"),
];
static BULK: [Param; 3] = [scalar("layer"), vector("num", 1), vector("den", 1)];
static OFFSET: [Param; 4] = [
    scalar("layer"),
    scalar("index"),
    scalar("num"),
    scalar("den"),
];
static INPUTS: [Param; 1] = [vector("inputs", 1)];
static OUTPUTS: [Param; 1] = [vector("outputs", 1)];
static REINFORCE: [Param; 2] = [scalar("alpha num"), scalar("alpha den")];
static BACKPROP: [Param; 2] = [scalar("eta num"), scalar("eta den")];
static DATASET_INIT: [Param; 1] = [scalar("maximum number of observations")];
static DATASET_ADD: [Param; 2] = [vector("input", 1), vector("output", 2)];
static BACKPROP_DATASET: [Param; 3] = [
    scalar("eta num"),
    scalar("eta den"),
    scalar("iterations"),
];

/// Every native function the bridge exposes to the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Native {
    GetError,
    ResetError,
    Init,
    Free,
    Reset,
    Clear,
    GetWeight,
    SetWeight,
    GetWeights,
    SetWeights,
    GetOffset,
    SetOffset,
    GetOffsets,
    SetOffsets,
    GetInputs,
    SetInputs,
    GetOutputs,
    SetOutputs,
    Eval,
    Reinforce,
    Backprop,
    DatasetInit,
    DatasetAdd,
    BackpropDataset,
}
use Native::*;

impl Native {
    pub const ALL: [Native; 24] = [
        GetError,
        ResetError,
        Init,
        Free,
        Reset,
        Clear,
        GetWeight,
        SetWeight,
        GetWeights,
        SetWeights,
        GetOffset,
        SetOffset,
        GetOffsets,
        SetOffsets,
        GetInputs,
        SetInputs,
        GetOutputs,
        SetOutputs,
        Eval,
        Reinforce,
        Backprop,
        DatasetInit,
        DatasetAdd,
        BackpropDataset,
    ];

    /// The name the VM knows this function by.
    pub fn name(&self) -> &'static str {
        match self {
            GetError => "nn.geterror",
            ResetError => "nn.reseterror",
            Init => "nn.init",
            Free => "nn.free",
            Reset => "nn.reset",
            Clear => "nn.clear",
            GetWeight => "nn.getweight",
            SetWeight => "nn.setweight",
            GetWeights => "nn.getweights",
            SetWeights => "nn.setweights",
            GetOffset => "nn.getoffset",
            SetOffset => "nn.setoffset",
            GetOffsets => "nn.getoffsets",
            SetOffsets => "nn.setoffsets",
            GetInputs => "nn.getinputs",
            SetInputs => "nn.setinputs",
            GetOutputs => "nn.getoutputs",
            SetOutputs => "nn.setoutputs",
            Eval => "nn.eval",
            Reinforce => "nn.reinforce",
            Backprop => "nn.backprop",
            DatasetInit => "nn.dataset.init",
            DatasetAdd => "nn.dataset.add",
            BackpropDataset => "nn.backprop.dataset",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|native| native.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            GetError => {
                "Last error of an nn call (0=ok, 1=out of memory, 2=no network, 3=index out of range, 4=not a single identity layer)"
            }
            ResetError => "Clear the last error",
            Init => "Build a network from its input count and the output count and activation of each layer (0=identity, 1=tanh, 2=sigmoid)",
            Free => "Release the network, its training workspace and its dataset",
            Reset => "Draw random weights and zero the offsets",
            Clear => "Zero every weight and offset",
            GetWeight => "Read one weight as a fraction",
            SetWeight => "Write one weight from a fraction",
            GetWeights => "Read the weights of a layer as fractions, one row per output",
            SetWeights => "Write the weights of a layer from fractions, one row per output",
            GetOffset => "Read one offset as a fraction",
            SetOffset => "Write one offset from a fraction",
            GetOffsets => "Read the offsets of a layer as fractions",
            SetOffsets => "Write the offsets of a layer from fractions",
            GetInputs => "Read the network inputs, rounded",
            SetInputs => "Write the network inputs",
            GetOutputs => "Read the network outputs, rounded",
            SetOutputs => "Write the network outputs, used as target by nn.backprop",
            Eval => "Compute the outputs from the inputs",
            Reinforce => "Hebbian update of a single identity layer from its inputs and outputs",
            Backprop => "One back-propagation step towards the current outputs",
            DatasetInit => "Create an empty dataset sized after the current network",
            DatasetAdd => "Add an input/output observation to the dataset",
            BackpropDataset => "Back-propagation over the whole dataset, repeated a number of times",
        }
    }

    /// The parameters of this function, in the order their addresses are passed.
    pub fn params(&self) -> &'static [Param] {
        match self {
            GetError => &GET_ERROR,
            ResetError | Free | Reset | Clear | Eval => &[],
            Init => &INIT,
            GetWeight | SetWeight => &WEIGHT,
            GetWeights | SetWeights | GetOffsets | SetOffsets => &BULK,
            GetOffset | SetOffset => &OFFSET,
            GetInputs | SetInputs => &INPUTS,
            GetOutputs | SetOutputs => &OUTPUTS,
            Reinforce => &REINFORCE,
            Backprop => &BACKPROP,
            DatasetInit => &DATASET_INIT,
            DatasetAdd => &DATASET_ADD,
            BackpropDataset => &BACKPROP_DATASET,
        }
    }

    /// The amount of vector lengths passed after the addresses.
    pub fn groups(&self) -> usize {
        self.params()
            .iter()
            .filter_map(|param| match param.slot {
                Slot::Vector(group) => Some(group as usize),
                Slot::Scalar => None,
            })
            .max()
            .unwrap_or(0)
    }
}
