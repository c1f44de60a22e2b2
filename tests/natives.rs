use std::num::NonZeroUsize;

use nn_bridge::{ErrorCode, Fraction, Native, NativeErr, Natives, NativesConfig};
use nn_engine::arch::activations::ActFn;

fn natives() -> Natives {
    Natives::new(NativesConfig::default().with_seed(42))
}

fn with_capacity(capacity: usize) -> Natives {
    let config = NativesConfig::default()
        .with_seed(42)
        .with_capacity(NonZeroUsize::new(capacity).unwrap());

    Natives::new(config)
}

fn frac(num: i16, den: i16) -> Fraction {
    Fraction::new(num, den).unwrap()
}

fn geterror(natives: &mut Natives) -> i16 {
    let mut vars = [-1];
    natives.call(Native::GetError, &[0], &mut vars).unwrap();
    vars[0]
}

#[test]
fn topology_propagation() {
    let mut natives = natives();
    natives.init(3, &[4, 2], &[1, 2]).unwrap();

    let layers = natives.network().layers();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].dim(), (3, 4));
    assert_eq!(layers[0].act_fn(), ActFn::Tanh);
    assert_eq!(layers[1].dim(), (4, 2));
    assert_eq!(layers[1].act_fn(), ActFn::Sigmoid);
    assert!(layers.iter().all(|layer| layer.offsets().iter().all(|&b| b == 0.)));
}

#[test]
fn topology_propagation_from_vm() {
    let mut natives = natives();
    let mut vars = [3, 4, 2, 1, 7];

    natives.call(Native::Init, &[0, 1, 3, 2], &mut vars).unwrap();

    let layers = natives.network().layers();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].dim(), (3, 4));
    assert_eq!(layers[0].act_fn(), ActFn::Tanh);
    assert_eq!(layers[1].dim(), (4, 2));
    assert_eq!(layers[1].act_fn(), ActFn::Identity);
}

#[test]
fn invalid_dimensions() {
    let mut natives = natives();
    natives.init(2, &[2], &[0]).unwrap();

    let err = natives.init(2, &[3, 0], &[0, 0]).unwrap_err();
    assert!(matches!(err, NativeErr::InvalidDimension { value: 0, .. }));
    assert!(natives.network().is_empty());

    let mut vars = [-1, 2, 0];
    assert!(natives.call(Native::Init, &[0, 1, 2, 1], &mut vars).is_err());
    assert_eq!(natives.error(), ErrorCode::OutOfMemory);
}

#[test]
fn bounds_rejection() {
    let mut natives = natives();
    natives.init(2, &[3], &[0]).unwrap();
    let weights = natives.network().layers()[0].weights().clone();
    let offsets = natives.network().layers()[0].offsets().clone();

    for (layer, input, output) in [(1, 0, 0), (-1, 0, 0), (0, 2, 0), (0, -1, 0), (0, 0, 3)] {
        let err = natives.get_weight(layer, input, output).unwrap_err();
        assert!(matches!(err, NativeErr::IndexOutOfRange { .. }), "{err}");

        let err = natives.set_weight(layer, input, output, 1, 2).unwrap_err();
        assert!(matches!(err, NativeErr::IndexOutOfRange { .. }), "{err}");
    }

    for (layer, index) in [(1, 0), (0, 3), (0, -1)] {
        assert!(natives.get_offset(layer, index).is_err());
        assert!(natives.set_offset(layer, index, 1, 2).is_err());
    }

    let mut num = [0; 3];
    let mut den = [0; 3];
    assert!(natives.get_offsets(2, &mut num, &mut den).is_err());
    assert!(natives.set_weights(-3, &num, &den).is_err());

    assert_eq!(natives.network().layers()[0].weights(), &weights);
    assert_eq!(natives.network().layers()[0].offsets(), &offsets);
}

#[test]
fn bounds_rejection_from_vm() {
    let mut natives = natives();
    natives.init(2, &[3], &[0]).unwrap();
    let weights = natives.network().layers()[0].weights().clone();

    // layer, input, output, num, den
    let mut vars = [0, 5, 0, 1, 2];
    let err = natives
        .call(Native::SetWeight, &[0, 1, 2, 3, 4], &mut vars)
        .unwrap_err();

    assert!(matches!(err, NativeErr::IndexOutOfRange { what: "input", .. }));
    assert_eq!(natives.error(), ErrorCode::IndexOutOfRange);
    assert_eq!(natives.network().layers()[0].weights(), &weights);

    let mut vars = [0, 0, 0, 7, 7];
    natives.reset_error();
    natives
        .call(Native::GetWeight, &[0, 1, 2, 3, 4], &mut vars[..4])
        .unwrap_err();
    assert_eq!(natives.error(), ErrorCode::IndexOutOfRange);
    assert_eq!(vars[3], 7);
}

#[test]
fn bulk_clamp() {
    let mut natives = natives();
    natives.init(2, &[3], &[0]).unwrap();
    natives.clear().unwrap();

    let written = natives.set_weights(0, &[1; 10], &[2; 10]).unwrap();
    assert_eq!(written, 6);
    assert!(
        natives.network().layers()[0]
            .weights()
            .iter()
            .all(|&w| w == 0.5)
    );

    let written = natives.set_offsets(0, &[1; 10], &[4; 10]).unwrap();
    assert_eq!(written, 3);
    assert!(
        natives.network().layers()[0]
            .offsets()
            .iter()
            .all(|&b| b == 0.25)
    );
}

#[test]
fn bulk_clamp_from_vm() {
    let mut natives = natives();
    natives.init(2, &[3], &[0]).unwrap();
    natives.clear().unwrap();

    // layer, then 8 numerators, then 8 denominators.
    let mut vars = [0; 17];
    vars[1..9].fill(-3);
    vars[9..17].fill(4);
    natives.call(Native::SetWeights, &[0, 1, 9, 8], &mut vars).unwrap();
    assert!(
        natives.network().layers()[0]
            .weights()
            .iter()
            .all(|&w| w == -0.75)
    );

    // Only 6 pairs exist, the remaining variables are left alone.
    let mut vars = [99; 17];
    vars[0] = 0;
    natives.call(Native::GetWeights, &[0, 1, 9, 8], &mut vars).unwrap();
    assert_eq!(&vars[1..9], &[-3, -3, -3, -3, -3, -3, 99, 99]);
    assert_eq!(&vars[9..17], &[4, 4, 4, 4, 4, 4, 99, 99]);
}

#[test]
fn short_bulk_reads() {
    let mut natives = natives();
    natives.init(2, &[3], &[0]).unwrap();
    natives.set_weights(0, &[1, 2, 3, 4, 5, 6], &[1; 6]).unwrap();

    let mut num = [0; 4];
    let mut den = [0; 4];
    let read = natives.get_weights(0, &mut num, &mut den).unwrap();

    assert_eq!(read, 4);
    assert_eq!(num, [1, 2, 3, 4]);
    assert_eq!(den, [1; 4]);
}

#[test]
fn hebbian_restriction() {
    let mut natives = natives();
    natives.init(2, &[2, 1], &[0, 0]).unwrap();
    let weights: Vec<_> = natives
        .network()
        .layers()
        .iter()
        .map(|layer| layer.weights().clone())
        .collect();

    let err = natives.reinforce(1, 2).unwrap_err();
    assert_eq!(err, NativeErr::UnsuitableForHebbian);

    let mut vars = [1, 2];
    assert!(natives.call(Native::Reinforce, &[0, 1], &mut vars).is_err());
    assert_eq!(natives.error(), ErrorCode::UnsuitableForHebbian);
    assert_eq!(geterror(&mut natives), 4);

    for (layer, before) in natives.network().layers().iter().zip(&weights) {
        assert_eq!(layer.weights(), before);
    }

    // The topology is checked before the learning rate.
    natives.reset_error();
    let mut vars = [1, 0];
    let err = natives
        .call(Native::Reinforce, &[0, 1], &mut vars)
        .unwrap_err();
    assert_eq!(err, NativeErr::UnsuitableForHebbian);
    assert_eq!(geterror(&mut natives), 4);

    natives.init(2, &[1], &[1]).unwrap();
    assert_eq!(
        natives.reinforce(1, 2).unwrap_err(),
        NativeErr::UnsuitableForHebbian
    );
}

#[test]
fn hebbian_update() {
    let mut natives = natives();
    natives.init(2, &[1], &[0]).unwrap();
    natives.clear().unwrap();

    // output = 1/2 * 1 + 0 * 0
    natives.set_weight(0, 0, 0, 1, 2).unwrap();
    natives.set_inputs(&[1, 0]).unwrap();
    natives.eval().unwrap();

    natives.reinforce(1, 2).unwrap();

    assert_eq!(natives.get_weight(0, 0, 0).unwrap(), frac(3, 4));
    assert_eq!(natives.get_weight(0, 1, 0).unwrap(), frac(0, 1));
    assert_eq!(natives.error(), ErrorCode::Ok);
}

#[test]
fn set_get_weight_round_trip() {
    let mut natives = natives();
    natives.init(2, &[2], &[0]).unwrap();

    natives.set_weight(0, 0, 0, 1, 3).unwrap();
    assert_eq!(natives.get_weight(0, 0, 0).unwrap(), frac(1, 3));

    natives.set_weight(0, 1, 1, 2, -4).unwrap();
    assert_eq!(natives.get_weight(0, 1, 1).unwrap(), frac(-1, 2));
}

#[test]
fn set_get_weight_round_trip_from_vm() {
    let mut natives = natives();
    natives.init(2, &[2], &[0]).unwrap();

    // layer, input, output, num, den
    let mut vars = [0, 1, 0, 1, 3];
    natives
        .call(Native::SetWeight, &[0, 1, 2, 3, 4], &mut vars)
        .unwrap();

    let mut vars = [0, 1, 0, 0, 0];
    natives
        .call_by_name("nn.getweight", &[0, 1, 2, 3, 4], &mut vars)
        .unwrap()
        .unwrap();
    assert_eq!(&vars[3..], &[1, 3]);

    assert!(natives.call_by_name("nn.getweigth", &[], &mut vars).is_none());
}

#[test]
fn offsets_round_trip() {
    let mut natives = natives();
    natives.init(1, &[3], &[0]).unwrap();

    natives.set_offset(0, 2, -5, 8).unwrap();
    assert_eq!(natives.get_offset(0, 2).unwrap(), frac(-5, 8));

    let mut num = [0; 3];
    let mut den = [0; 3];
    natives.get_offsets(0, &mut num, &mut den).unwrap();
    assert_eq!(num, [0, 0, -5]);
    assert_eq!(den, [1, 1, 8]);
}

#[test]
fn offsets_from_vm() {
    let mut natives = natives();
    natives.init(1, &[3], &[0]).unwrap();

    // layer, index, num, den
    let mut vars = [0, 2, -5, 8];
    natives.call(Native::SetOffset, &[0, 1, 2, 3], &mut vars).unwrap();

    let mut vars = [0, 2, 0, 0];
    natives.call(Native::GetOffset, &[0, 1, 2, 3], &mut vars).unwrap();
    assert_eq!(&vars[2..], &[-5, 8]);

    let mut vars = [0, 3, 7, 7];
    natives
        .call(Native::GetOffset, &[0, 1, 2, 3], &mut vars)
        .unwrap_err();
    assert_eq!(natives.error(), ErrorCode::IndexOutOfRange);
    assert_eq!(&vars[2..], &[7, 7]);

    // layer, then 3 numerators, then 3 denominators. The zero denominator is skipped.
    let mut vars = [0, 1, 2, 3, 2, 0, 2];
    natives.call(Native::SetOffsets, &[0, 1, 4, 3], &mut vars).unwrap();
    assert_eq!(
        natives.network().layers()[0].offsets().to_vec(),
        vec![0.5f32, 0., 1.5]
    );

    // Two numerators at 1..3 and two denominators at 4..6, the variables around them stay.
    let mut vars = [99; 7];
    vars[0] = 0;
    natives.call(Native::GetOffsets, &[0, 1, 4, 2], &mut vars).unwrap();
    assert_eq!(vars, [0, 1, 0, 99, 2, 1, 99]);

    let mut vars = [0; 7];
    natives.call(Native::GetOffsets, &[0, 1, 4, 3], &mut vars).unwrap();
    assert_eq!(vars, [0, 1, 0, 3, 2, 1, 2]);
}

#[test]
fn inputs_and_outputs_are_rounded() {
    let mut natives = natives();
    natives.init(1, &[2], &[0]).unwrap();
    natives.clear().unwrap();
    natives.set_weights(0, &[1, -1], &[2, 2]).unwrap();

    assert_eq!(natives.set_inputs(&[3, 100]).unwrap(), 1);
    natives.eval().unwrap();

    let mut inputs = [0; 3];
    assert_eq!(natives.get_inputs(&mut inputs).unwrap(), 1);
    assert_eq!(inputs, [3, 0, 0]);

    // 1.5 and -1.5 round away from zero.
    let mut outputs = [0; 2];
    assert_eq!(natives.get_outputs(&mut outputs).unwrap(), 2);
    assert_eq!(outputs, [2, -2]);
}

#[test]
fn inputs_and_outputs_from_vm() {
    let mut natives = natives();
    natives.init(2, &[3], &[0]).unwrap();
    natives.clear().unwrap();
    natives.set_weights(0, &[2, 0, 0, 1, 1, 1], &[1; 6]).unwrap();

    let mut vars = [4, -2];
    natives.call(Native::SetInputs, &[0, 2], &mut vars).unwrap();
    natives.call(Native::Eval, &[], &mut []).unwrap();

    // Three destinations for two inputs.
    let mut vars = [99; 4];
    natives.call(Native::GetInputs, &[0, 3], &mut vars).unwrap();
    assert_eq!(vars, [4, -2, 99, 99]);

    // Two destinations for three outputs.
    let mut vars = [99; 4];
    natives.call(Native::GetOutputs, &[1, 2], &mut vars).unwrap();
    assert_eq!(vars, [99, 8, -2, 99]);

    let mut vars = [0; 3];
    natives.call(Native::GetOutputs, &[0, 3], &mut vars).unwrap();
    assert_eq!(vars, [8, -2, 2]);

    let mut vars = [5, 6, 7];
    natives.call(Native::SetOutputs, &[0, 3], &mut vars).unwrap();
    assert_eq!(
        natives.network().layers()[0].output().to_vec(),
        vec![5f32, 6., 7.]
    );
}

#[test]
fn no_network() {
    let mut natives = natives();
    let mut buf = [0; 2];

    assert_eq!(natives.eval().unwrap_err(), NativeErr::NoNetwork);
    assert_eq!(natives.reset().unwrap_err(), NativeErr::NoNetwork);
    assert_eq!(natives.clear().unwrap_err(), NativeErr::NoNetwork);
    assert_eq!(natives.get_weight(0, 0, 0).unwrap_err(), NativeErr::NoNetwork);
    assert_eq!(natives.get_inputs(&mut buf).unwrap_err(), NativeErr::NoNetwork);
    assert_eq!(natives.set_outputs(&buf).unwrap_err(), NativeErr::NoNetwork);
    assert_eq!(natives.backprop(1, 2).unwrap_err(), NativeErr::NoNetwork);
    assert_eq!(natives.dataset_init(4).unwrap_err(), NativeErr::NoNetwork);

    natives.init(1, &[], &[]).unwrap();
    assert!(natives.network().is_empty());
    assert_eq!(natives.eval().unwrap_err(), NativeErr::NoNetwork);
}

#[test]
fn free_drops_everything() {
    let mut natives = natives();
    natives.init(2, &[2], &[0]).unwrap();
    natives.dataset_init(4).unwrap();
    natives.backprop(1, 2).unwrap();
    assert!(natives.in_use() > 0);

    natives.free();

    assert!(natives.network().is_empty());
    assert!(natives.dataset().is_none());
    assert!(natives.workspace().is_none());
    assert_eq!(natives.in_use(), 0);
    assert_eq!(natives.dataset_add(&[1, 2], &[3, 4]).unwrap_err(), NativeErr::NoDataset);
}

#[test]
fn lifecycle_from_vm() {
    let mut natives = natives();
    let mut vars = [2, 3, 0];
    natives.call(Native::Init, &[0, 1, 2, 1], &mut vars).unwrap();
    natives.set_offsets(0, &[1; 3], &[2; 3]).unwrap();
    let weights = natives.network().layers()[0].weights().clone();

    natives.call(Native::Reset, &[], &mut []).unwrap();
    let layer = &natives.network().layers()[0];
    assert_eq!(layer.dim(), (2, 3));
    assert!(layer.offsets().iter().all(|&b| b == 0.));
    assert_ne!(layer.weights(), &weights);

    natives.set_offsets(0, &[1; 3], &[2; 3]).unwrap();
    natives.call(Native::Clear, &[], &mut []).unwrap();
    let layer = &natives.network().layers()[0];
    assert_eq!(layer.dim(), (2, 3));
    assert!(layer.weights().iter().all(|&w| w == 0.));
    assert!(layer.offsets().iter().all(|&b| b == 0.));

    natives.dataset_init(4).unwrap();
    natives.call(Native::Free, &[], &mut []).unwrap();
    assert!(natives.network().is_empty());
    assert!(natives.dataset().is_none());
    assert_eq!(natives.in_use(), 0);

    assert!(natives.call(Native::Reset, &[], &mut []).is_err());
    assert_eq!(geterror(&mut natives), 2);
}

#[test]
fn error_register_is_sticky() {
    let mut natives = natives();
    assert_eq!(geterror(&mut natives), 0);

    assert!(natives.call(Native::Eval, &[], &mut []).is_err());
    assert_eq!(geterror(&mut natives), 2);

    let mut vars = [2, 2, 0];
    natives.call(Native::Init, &[0, 1, 2, 1], &mut vars).unwrap();
    natives.call(Native::Eval, &[], &mut []).unwrap();
    assert_eq!(geterror(&mut natives), 2);

    natives.call(Native::ResetError, &[], &mut []).unwrap();
    assert_eq!(geterror(&mut natives), 0);

    // Zero denominators are ignored without an error code.
    let mut vars = [0, 0, 0, 1, 0];
    assert!(natives.call(Native::SetWeight, &[0, 1, 2, 3, 4], &mut vars).is_err());
    assert_eq!(geterror(&mut natives), 0);
}

#[test]
fn malformed_calls() {
    let mut natives = natives();
    let mut vars = [0; 4];

    let err = natives.call(Native::GetWeight, &[0, 1], &mut vars).unwrap_err();
    assert!(matches!(err, NativeErr::Bind(_)));
    assert_eq!(natives.error(), ErrorCode::IndexOutOfRange);

    natives.reset_error();
    assert!(natives.call(Native::GetInputs, &[2, 3], &mut vars).is_err());
    assert_eq!(natives.error(), ErrorCode::IndexOutOfRange);
    assert_eq!(vars, [0; 4]);
}

#[test]
fn out_of_memory() {
    let mut natives = with_capacity(64);

    // 8*8 weights plus 8 inputs and 3*8 outputs, offsets and pre-activations.
    let err = natives.init(8, &[8], &[0]).unwrap_err();
    assert_eq!(
        err,
        NativeErr::OutOfMemory {
            requested: 96,
            available: 64
        }
    );
    assert!(natives.network().is_empty());

    let mut vars = [8, 8, 0];
    assert!(natives.call(Native::Init, &[0, 1, 2, 1], &mut vars).is_err());
    assert_eq!(geterror(&mut natives), 1);
}

#[test]
fn workspace_out_of_memory() {
    // Network: 2*4 + 2 + 3*4 = 22 slots, workspace: 2*4 + 2*4 = 16 slots.
    let mut natives = with_capacity(30);
    natives.init(2, &[4], &[0]).unwrap();
    let weights = natives.network().layers()[0].weights().clone();

    natives.set_inputs(&[1, 1]).unwrap();
    let err = natives.backprop(1, 2).unwrap_err();

    assert!(matches!(err, NativeErr::OutOfMemory { requested: 16, .. }));
    assert!(natives.workspace().is_none());
    assert_eq!(natives.network().layers()[0].weights(), &weights);

    let err = natives.dataset_init(2).unwrap_err();
    assert!(matches!(err, NativeErr::OutOfMemory { requested: 12, .. }));
}

#[test]
fn stale_workspace_after_init() {
    let mut natives = natives();
    natives.init(2, &[2], &[0]).unwrap();
    natives.backprop(1, 2).unwrap();
    let before = natives.workspace().unwrap().topology();

    natives.init(3, &[4, 1], &[1, 0]).unwrap();
    natives.set_inputs(&[1, 2, 3]).unwrap();
    natives.set_outputs(&[1]).unwrap();
    natives.backprop(1, 2).unwrap();

    let ws = natives.workspace().unwrap();
    assert_ne!(ws.topology(), before);
    assert!(ws.fits(natives.network()));
}

#[test]
fn backprop_moves_towards_the_outputs() {
    let mut natives = natives();
    natives.init(2, &[3, 1], &[1, 0]).unwrap();
    natives.set_inputs(&[1, -1]).unwrap();
    natives.set_outputs(&[1]).unwrap();

    let first = natives.backprop(1, 20).unwrap();
    let mut last = first;
    for _ in 0..500 {
        last = natives.backprop(1, 20).unwrap();
    }
    assert!(last < first, "{last} >= {first}");

    natives.eval().unwrap();
    let mut outputs = [0];
    natives.get_outputs(&mut outputs).unwrap();
    assert_eq!(outputs, [1]);
}

#[test]
fn backprop_from_vm() {
    let mut natives = natives();
    natives.init(1, &[1], &[0]).unwrap();
    natives.clear().unwrap();

    // input, target, eta num, eta den
    let mut vars = [1, 2, 1, 4];
    natives.call(Native::SetInputs, &[0, 1], &mut vars).unwrap();
    natives.call(Native::SetOutputs, &[1, 1], &mut vars).unwrap();

    // Prediction 0, target 2: both gradients are -4.
    natives.call(Native::Backprop, &[2, 3], &mut vars).unwrap();
    assert_eq!(natives.get_weight(0, 0, 0).unwrap(), frac(1, 1));
    assert_eq!(natives.get_offset(0, 0).unwrap(), frac(1, 1));
    assert!(natives.workspace().is_some());

    // The target survives the step.
    let mut out = [0];
    natives.call(Native::GetOutputs, &[0, 1], &mut out).unwrap();
    assert_eq!(out, [2]);

    let mut vars = [1, 0];
    let err = natives.call(Native::Backprop, &[0, 1], &mut vars).unwrap_err();
    assert_eq!(err, NativeErr::ZeroDenominator { what: "learning rate" });
    assert_eq!(natives.get_weight(0, 0, 0).unwrap(), frac(1, 1));
    assert_eq!(geterror(&mut natives), 0);
}

#[test]
fn zero_learning_rate_denominator() {
    let mut natives = natives();
    natives.init(2, &[1], &[0]).unwrap();
    let weights = natives.network().layers()[0].weights().clone();

    let err = natives.backprop(1, 0).unwrap_err();
    assert_eq!(err, NativeErr::ZeroDenominator { what: "learning rate" });
    assert!(natives.workspace().is_none());
    assert_eq!(natives.network().layers()[0].weights(), &weights);
}

#[test]
fn dataset_training() {
    let mut natives = natives();
    natives.init(2, &[1], &[0]).unwrap();
    natives.dataset_init(16).unwrap();

    for x0 in -1..=1 {
        for x1 in -1..=1 {
            natives.dataset_add(&[x0, x1], &[2 * x0 - x1 + 1]).unwrap();
        }
    }
    assert_eq!(natives.dataset().unwrap().len(), 9);

    let loss = natives.backprop_dataset(1, 4, 2000).unwrap();
    assert!(loss < 1e-6, "{loss}");

    let w0 = natives.get_weight(0, 0, 0).unwrap().value();
    let w1 = natives.get_weight(0, 1, 0).unwrap().value();
    let b = natives.get_offset(0, 0).unwrap().value();
    assert!((w0 - 2.).abs() < 1e-3, "{w0}");
    assert!((w1 + 1.).abs() < 1e-3, "{w1}");
    assert!((b - 1.).abs() < 1e-3, "{b}");

    natives.set_inputs(&[3, 2]).unwrap();
    natives.eval().unwrap();
    let mut outputs = [0];
    natives.get_outputs(&mut outputs).unwrap();
    assert_eq!(outputs, [5]);
}

#[test]
fn dataset_from_vm() {
    let mut natives = natives();
    natives.init(1, &[1], &[0]).unwrap();

    // max, x, y, eta num, eta den, iterations
    let mut vars = [4, 0, 0, 1, 2, 500];
    natives.call(Native::DatasetInit, &[0], &mut vars).unwrap();
    assert_eq!(natives.dataset().unwrap().capacity(), 4);

    for x in -3..3 {
        vars[1] = x;
        vars[2] = 3 - x;
        natives.call(Native::DatasetAdd, &[1, 2, 1, 1], &mut vars).unwrap();
    }

    // The ring keeps the newest four observations.
    let dataset = natives.dataset().unwrap();
    let xs: Vec<f32> = dataset.iter().map(|(x, _)| x[0]).collect();
    assert_eq!(xs, vec![-1f32, 0., 1., 2.]);

    natives
        .call(Native::BackpropDataset, &[3, 4, 5], &mut vars)
        .unwrap();

    let w = natives.get_weight(0, 0, 0).unwrap().value();
    let b = natives.get_offset(0, 0).unwrap().value();
    assert!((w + 1.).abs() < 1e-2, "{w}");
    assert!((b - 3.).abs() < 1e-2, "{b}");
}

#[test]
fn dataset_rules() {
    let mut natives = with_capacity(4096);
    natives.init(2, &[1], &[0]).unwrap();

    assert_eq!(natives.dataset_add(&[1], &[1]).unwrap_err(), NativeErr::NoDataset);
    assert_eq!(natives.backprop_dataset(1, 2, 1).unwrap_err(), NativeErr::NoDataset);
    assert!(matches!(
        natives.dataset_init(0).unwrap_err(),
        NativeErr::InvalidDimension { .. }
    ));

    natives.dataset_init(i16::MAX).unwrap();
    assert_eq!(
        natives.dataset().unwrap().capacity(),
        natives.config().max_observations.get()
    );

    natives.dataset_add(&[1, 2, 3], &[]).unwrap();
    let weights = natives.network().layers()[0].weights().clone();
    assert_eq!(natives.backprop_dataset(1, 2, 0).unwrap(), 0.);
    assert_eq!(natives.backprop_dataset(1, 2, -5).unwrap(), 0.);
    assert_eq!(natives.network().layers()[0].weights(), &weights);

    // The dataset survives a new network, but no longer fits it.
    natives.init(3, &[1], &[0]).unwrap();
    assert!(natives.dataset().is_some());
    let err = natives.backprop_dataset(1, 2, 1).unwrap_err();
    assert_eq!(err, NativeErr::DatasetMismatch { got: 3, expected: 4 });
    assert_eq!(err.code(), Some(ErrorCode::IndexOutOfRange));
}
