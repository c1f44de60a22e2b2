use std::{env, fs};

use anyhow::{Context, anyhow};
use log::info;
use nn_bridge::{Fraction, Natives, NativesConfig};

const VARS: usize = 64;

/// A VM variable space with a bump allocator, standing in for the host VM.
struct Vm {
    vars: Vec<i16>,
    next: usize,
}

impl Vm {
    fn new() -> Self {
        Self {
            vars: vec![0; VARS],
            next: 0,
        }
    }

    /// Places `values` in consecutive variables and returns the address of the first one.
    fn alloc(&mut self, values: &[i16]) -> anyhow::Result<u16> {
        let addr = self.next;
        let end = addr + values.len();
        self.vars
            .get_mut(addr..end)
            .ok_or_else(|| anyhow!("the VM only has {VARS} variables"))?
            .copy_from_slice(values);

        self.next = end;
        Ok(addr as u16)
    }

    fn get(&self, addr: u16, len: usize) -> &[i16] {
        let addr = addr as usize;
        &self.vars[addr..addr + len]
    }

    fn call(&mut self, natives: &mut Natives, name: &str, raw: &[u16]) -> anyhow::Result<()> {
        natives
            .call_by_name(name, raw, &mut self.vars)
            .ok_or_else(|| anyhow!("unknown native {name}"))?
            .with_context(|| format!("{name} failed"))
    }
}

fn load_config() -> anyhow::Result<NativesConfig> {
    let Ok(path) = env::var("NN_CONFIG") else {
        return Ok(NativesConfig::default());
    };

    let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config = serde_json::from_str(&json).with_context(|| format!("parsing {path}"))?;
    info!("loaded config from {path}");
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = load_config()?;
    let mut natives = Natives::new(config);
    let mut vm = Vm::new();

    // A single identity layer learning y = 2*x0 - x1 + 1.
    let input_count = vm.alloc(&[2])?;
    let output_counts = vm.alloc(&[1])?;
    let activations = vm.alloc(&[0])?;
    vm.call(&mut natives, "nn.init", &[input_count, output_counts, activations, 1])?;

    let max = vm.alloc(&[16])?;
    vm.call(&mut natives, "nn.dataset.init", &[max])?;

    let x = vm.alloc(&[0, 0])?;
    let y = vm.alloc(&[0])?;
    for x0 in -1..=1i16 {
        for x1 in -1..=1i16 {
            vm.vars[x as usize] = x0;
            vm.vars[x as usize + 1] = x1;
            vm.vars[y as usize] = 2 * x0 - x1 + 1;
            vm.call(&mut natives, "nn.dataset.add", &[x, y, 2, 1])?;
        }
    }

    let eta = vm.alloc(&[1, 4, 500])?;
    vm.call(&mut natives, "nn.backprop.dataset", &[eta, eta + 1, eta + 2])?;

    let layer = vm.alloc(&[0])?;
    let num = vm.alloc(&[0, 0])?;
    let den = vm.alloc(&[0, 0])?;
    vm.call(&mut natives, "nn.getweights", &[layer, num, den, 2])?;
    let index = vm.alloc(&[0])?;
    let offset = vm.alloc(&[0, 0])?;
    vm.call(&mut natives, "nn.getoffset", &[layer, index, offset, offset + 1])?;

    for (i, (&n, &d)) in vm.get(num, 2).iter().zip(vm.get(den, 2)).enumerate() {
        println!("w[{i}] = {n}/{d}");
    }
    let b = vm.get(offset, 2);
    println!("b = {}/{}", b[0], b[1]);

    let inputs = vm.alloc(&[3, 2])?;
    vm.call(&mut natives, "nn.setinputs", &[inputs, 2])?;
    vm.call(&mut natives, "nn.eval", &[])?;
    let outputs = vm.alloc(&[0])?;
    vm.call(&mut natives, "nn.getoutputs", &[outputs, 1])?;
    println!("f(3, 2) = {}", vm.get(outputs, 1)[0]);

    let error = vm.alloc(&[0])?;
    vm.call(&mut natives, "nn.geterror", &[error])?;
    println!("error = {}", vm.get(error, 1)[0]);

    println!("pi ~ {}", Fraction::approximate(std::f32::consts::PI));
    Ok(())
}
