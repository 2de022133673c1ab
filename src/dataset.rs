//! In-memory model of one GEOS-Chem output collection: an ordered set of
//! named array variables sharing common dimensions.

use std::collections::HashMap;

use ndarray::ArrayD;

use crate::error::Error;
use crate::naming::RenamePlan;

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub units: String,
    pub data: ArrayD<f64>,
}

impl Variable {
    pub fn new(name: &str, units: &str, data: ArrayD<f64>) -> Variable {
        Variable {
            name: name.to_string(),
            units: units.to_string(),
            data,
        }
    }

    /// Number of array dimensions.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }
}

/// One model-output dataset. Variable order is the order of insertion
/// (i.e. the order variables appear in the source file) and is preserved
/// through renames and copies.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    vars: Vec<Variable>,
}

impl Collection {
    pub fn new() -> Collection {
        Collection { vars: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn push(&mut self, var: Variable) -> Result<(), Error> {
        if self.variable(&var.name).is_some() {
            return Err(Error::InvalidData(format!(
                "{} already in dataset!",
                var.name
            )));
        }
        self.vars.push(var);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().find(|v| v.name == name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.vars.iter()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.vars.iter().map(|v| v.name.as_str()).collect()
    }

    /// Rename variables in place according to a rename plan. Variables with
    /// no entry in the plan are left untouched. If any two variables would
    /// end up with the same name, nothing is modified and
    /// [`Error::DuplicateTarget`] is returned.
    pub fn rename_variables(&mut self, plan: &RenamePlan) -> Result<(), Error> {
        let targets = self.validate_rename(plan)?;
        for (var, target) in self.vars.iter_mut().zip(targets) {
            if let Some(t) = target {
                var.name = t;
            }
        }
        Ok(())
    }

    /// As [`Collection::rename_variables`], but returns a renamed copy and
    /// leaves `self` untouched.
    pub fn renamed(&self, plan: &RenamePlan) -> Result<Collection, Error> {
        let mut out = self.clone();
        out.rename_variables(plan)?;
        Ok(out)
    }

    /// Check the complete post-rename name list for collisions before any
    /// mutation happens. Returns the per-variable targets (None = keep).
    fn validate_rename(&self, plan: &RenamePlan) -> Result<Vec<Option<String>>, Error> {
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut targets = Vec::with_capacity(self.vars.len());
        for var in &self.vars {
            let target = plan.target_for(&var.name).map(|t| t.to_string());
            let final_name = target.clone().unwrap_or_else(|| var.name.clone());
            if let Some(first) = seen.get(&final_name) {
                return Err(Error::DuplicateTarget {
                    target: final_name,
                    first: first.clone(),
                    second: var.name.clone(),
                });
            }
            seen.insert(final_name, var.name.clone());
            targets.push(target);
        }
        Ok(targets)
    }

    /// Add a new variable as a linear combination of existing variables:
    /// `sum(coefficient * variable)` over `terms`.
    pub fn add_summed_variable(
        &mut self,
        varname: &str,
        terms: &[(&str, f64)],
        units: &str,
    ) -> Result<(), Error> {
        if terms.is_empty() {
            return Err(Error::InvalidData(
                "must pass at least one (variable, coefficient) term".to_string(),
            ));
        }
        let mut sum: Option<ArrayD<f64>> = None;
        for &(name, coeff) in terms {
            let var = self.variable(name).ok_or_else(|| Error::MissingVariable {
                name: name.to_string(),
                dataset: "dataset".to_string(),
            })?;
            let term = &var.data * coeff;
            sum = Some(match sum {
                None => term,
                Some(acc) => {
                    if acc.shape() != term.shape() {
                        return Err(Error::InvalidData(format!(
                            "variable '{}' has shape {:?}, expected {:?}",
                            name,
                            term.shape(),
                            acc.shape()
                        )));
                    }
                    acc + term
                }
            });
        }
        let units = units.to_string();
        self.push(Variable {
            name: varname.to_string(),
            units,
            // terms is non-empty, so the accumulator is set
            data: sum.unwrap(),
        })
    }
}
