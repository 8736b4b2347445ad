//! Storage assembly: turns a peeled hypergraph into a fully assigned storage
//! `D = L || R` with `lm` sparse slots and `rm` dense slots.
//!
//! Order of assignment:
//! 1. dense columns outside the pivot set `C` and the sparse slots of core
//!    keys get fresh random values;
//! 2. the core system is solved for the dense columns in `C`;
//! 3. peeled keys are replayed in reverse removal order, each deriving its
//!    pivot slot;
//! 4. untouched sparse slots are filled according to the [`FillMode`].

use rand::{CryptoRng, RngCore};

use crate::error::{OkvsError, Result};
use crate::hypergraph::H3Hypergraph;
use crate::params::FillMode;
use crate::peeling::{PeelEntry, TwoCore};
use crate::solver::DenseSystem;
use crate::utils::{xor_u8s_inplace, TimerOnce};

/// A storage slot while encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    Unset,
    Assigned(Vec<u8>),
}

impl Slot {
    pub fn is_unset(&self) -> bool {
        matches!(self, Slot::Unset)
    }
}

/// Owns the slots of one encode call.
pub struct StorageAssembler<'a, R> {
    graph: &'a H3Hypergraph,
    values: &'a [&'a [u8]],
    byte_l: usize,
    rm: usize,
    left: Vec<Slot>,
    rng: &'a mut R,
}

impl<'a, R> StorageAssembler<'a, R>
where
    R: RngCore + CryptoRng,
{
    /// `values[i]` is the value of edge `i`, each `byte_l` bytes.
    pub fn new(graph: &'a H3Hypergraph, values: &'a [&'a [u8]], byte_l: usize, rm: usize, rng: &'a mut R) -> Self {
        assert_eq!(graph.edge_count(), values.len(), "one value per edge");
        Self {
            graph,
            values,
            byte_l,
            rm,
            left: vec![Slot::Unset; graph.lm()],
            rng,
        }
    }

    /// Run all passes and return the `lm + rm` slots.
    pub fn assemble(mut self, two_core: TwoCore, fill_mode: FillMode) -> Result<Vec<Vec<u8>>> {
        let TwoCore { peel_stack, core } = two_core;
        let timer = TimerOnce::new();
        let right = self.solve_core(&core)?;
        timer.finish("core solve");

        let timer = TimerOnce::new();
        self.back_substitute(peel_stack, &right)?;
        timer.finish("back substitution");

        let byte_l = self.byte_l;
        for slot in self.left.iter_mut().filter(|slot| slot.is_unset()) {
            let value = match fill_mode {
                FillMode::Random => {
                    let mut value = vec![0u8; byte_l];
                    self.rng.fill_bytes(&mut value);
                    value
                }
                FillMode::Zero => vec![0u8; byte_l],
            };
            *slot = Slot::Assigned(value);
        }

        let mut storage = into_values(self.left, "sparse")?;
        storage.extend(right);
        Ok(storage)
    }

    fn random_value(&mut self) -> Vec<u8> {
        let mut value = vec![0u8; self.byte_l];
        self.rng.fill_bytes(&mut value);
        value
    }

    fn left_value(&self, vertex: usize) -> Result<&[u8]> {
        match &self.left[vertex] {
            Slot::Assigned(value) => Ok(value),
            Slot::Unset => Err(OkvsError::InvariantViolation(format!("sparse slot {} read before assignment", vertex))),
        }
    }

    /// Passes A and B. Returns the dense slots, all assigned.
    fn solve_core(&mut self, core: &[usize]) -> Result<Vec<Vec<u8>>> {
        let masks: Vec<_> = core.iter().map(|e| self.graph.mask(*e)).collect();
        let system = match DenseSystem::eliminate(&masks, self.rm) {
            Ok(system) => system,
            Err(e) => {
                tracing::warn!(core = core.len(), rm = self.rm, error = %e, "two-core cannot be solved");
                return Err(e);
            }
        };

        // free dense columns first, then the sparse slots of core keys
        let pivots = system.column_mask();
        let mut right = vec![Slot::Unset; self.rm];
        for (column, slot) in right.iter_mut().enumerate() {
            if !pivots.get(column) {
                let mut value = vec![0u8; self.byte_l];
                self.rng.fill_bytes(&mut value);
                *slot = Slot::Assigned(value);
            }
        }
        for e in core {
            for v in self.graph.vertices(*e) {
                if self.left[v].is_unset() {
                    self.left[v] = Slot::Assigned(self.random_value());
                }
            }
        }

        let mut residuals = Vec::with_capacity(core.len());
        for e in core {
            let mut residual = self.values[*e].to_vec();
            for v in self.graph.vertices(*e) {
                xor_u8s_inplace(&mut residual, self.left_value(v)?);
            }
            for column in self.graph.mask(*e).iter_ones() {
                if let Slot::Assigned(value) = &right[column] {
                    xor_u8s_inplace(&mut residual, value);
                }
            }
            residuals.push(residual);
        }

        for (column, value) in system.columns().iter().zip(system.solve(&residuals)) {
            right[*column] = Slot::Assigned(value);
        }
        into_values(right, "dense")
    }

    /// Pass C: replay the peel stack from the back.
    fn back_substitute(&mut self, mut peel_stack: Vec<PeelEntry>, right: &[Vec<u8>]) -> Result<()> {
        while let Some(entry) = peel_stack.pop() {
            if !self.left[entry.pivot].is_unset() {
                return Err(OkvsError::InvariantViolation(format!(
                    "pivot {} of edge {} already assigned",
                    entry.pivot, entry.edge
                )));
            }
            let mut derived = self.values[entry.edge].to_vec();
            self.graph.mask(entry.edge).xor_selected(right, &mut derived);
            for v in entry.others() {
                if self.left[v].is_unset() {
                    self.left[v] = Slot::Assigned(self.random_value());
                }
                xor_u8s_inplace(&mut derived, self.left_value(v)?);
            }
            self.left[entry.pivot] = Slot::Assigned(derived);
        }
        Ok(())
    }
}

fn into_values(slots: Vec<Slot>, part: &str) -> Result<Vec<Vec<u8>>> {
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Slot::Assigned(value) => Ok(value),
            Slot::Unset => Err(OkvsError::InvariantViolation(format!("{} slot {} left unset", part, index))),
        })
        .collect()
}
