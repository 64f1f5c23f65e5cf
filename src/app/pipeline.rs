use anyhow::{Context, Result};
use log::info;

type Step<C> = Box<dyn FnOnce(&mut C) -> Result<()>>;

/// Named steps run in order against a shared context.
///
/// The first failing step stops the pipeline; its name is attached to the
/// error.
pub struct Pipeline<C> {
    steps: Vec<(String, Step<C>)>,
}

impl<C> Default for Pipeline<C> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<C> Pipeline<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<F>(mut self, name: impl Into<String>, step: F) -> Self
    where
        F: FnOnce(&mut C) -> Result<()> + 'static,
    {
        self.steps.push((name.into(), Box::new(step)));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn run(self, context: &mut C) -> Result<()> {
        let total = self.steps.len();
        for (i, (name, step)) in self.steps.into_iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, name);
            step(context).with_context(|| format!("Step '{}' failed", name))?;
        }
        Ok(())
    }
}
