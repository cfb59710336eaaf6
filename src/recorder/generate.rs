//! Row generation for each recorder kind

use std::rc::Rc;

use crate::core::error::Result;
use crate::entities::compgroup::{discount_factor, ComponentGroup};
use crate::entities::structure::Structure;
use crate::math::integration::Integrator;
use crate::math::lognormal::LogNormalDist;

use super::{Cell, Column, Recorder, RecorderKind, StructCostMode, Table, Target};

impl Recorder {
    /// Compute this recorder's table
    pub fn generate(&self, integrator: &Integrator) -> Result<Table> {
        match &self.target {
            Target::DetFn(f) => self.over_grid("x", &["y".to_string()], |x| Ok(vec![f.value_at(x)])),
            Target::ProbFn(f) => self.generic_over_grid("x", |x| Ok(f.distribution(x))),
            Target::Im(im) => match self.kind {
                RecorderKind::ImRate => self.over_grid(im.id(), &["lambda".to_string()], |x| Ok(vec![im.lambda(x)])),
                RecorderKind::Collapse => self.over_grid(
                    im.id(),
                    &["p(Demolition)".to_string(), "p(Collapse)".to_string()],
                    |x| Ok(vec![im.p_demolition(x)?, im.p_collapse(x)?]),
                ),
                _ => {
                    let mut table = Table::new(vec![
                        "IM".to_string(),
                        "rate(Demolition)".to_string(),
                        "rate(Collapse)".to_string(),
                    ]);
                    table.push(vec![
                        Cell::Text(im.id().to_string()),
                        im.demolition_rate(integrator)?.into(),
                        im.collapse_rate(integrator)?.into(),
                    ]);
                    Ok(table)
                }
            },
            Target::Edp(edp) => match self.kind {
                RecorderKind::EdpIm => self.generic_over_grid(edp.im().id(), |x| Ok(edp.distribution(x))),
                _ => self.over_grid("EDP", &["lambda".to_string()], |y| Ok(vec![edp.lambda(y, integrator)])),
            },
            Target::CompGroup(g) => self.comp_group(g, integrator),
            Target::Structure(s) => self.structure(s, integrator),
        }
    }

    fn comp_group(&self, g: &Rc<ComponentGroup>, integrator: &Integrator) -> Result<Table> {
        let im_label = g.im().id();
        match self.kind {
            RecorderKind::DsEdp => self.over_grid("EDP", &ds_labels(g.size()), |x| {
                Ok(with_sum(g.fragility().p_exceeded(x)))
            }),
            RecorderKind::DsIm => self.over_grid(im_label, &ds_labels(g.size()), |x| {
                Ok(with_sum(g.p_ds_im(x, integrator)))
            }),
            RecorderKind::DsRate => {
                let mut table = Table::new(ds_labels(g.size()));
                table.push(cells(with_sum(g.rate(integrator))));
                Ok(table)
            }
            RecorderKind::CostEdp => self.generic_over_grid("EDP", |x| Ok(g.cost_dist_edp(x))),
            RecorderKind::CostIm => self.generic_over_grid(im_label, |x| Ok(g.cost_dist_im(x, integrator))),
            RecorderKind::DelayEdp => self.generic_over_grid("EDP", |x| g.delay_dist_edp(x)),
            RecorderKind::DelayIm => self.generic_over_grid(im_label, |x| g.delay_dist_im(x, integrator)),
            RecorderKind::CostRate => {
                self.over_grid("t", &["Rate".to_string()], |t| Ok(vec![g.lambda_cost(t, integrator)]))
            }
            _ => {
                let mut table = Table::new(vec!["E[AL]".to_string()]);
                table.push(vec![g.e_annual_cost(integrator).into()]);
                Ok(table)
            }
        }
    }

    fn structure(&self, s: &Rc<Structure>, integrator: &Integrator) -> Result<Table> {
        let im = s.im()?;
        let im_label = im.id();
        match self.kind {
            RecorderKind::Pdf => {
                let mut table = self.over_grid(im_label, &["pdf".to_string()], |x| Ok(vec![s.pdf(x, integrator)?]))?;
                if self.options.normalise {
                    normalise_column(&mut table, 1);
                }
                Ok(table)
            }
            RecorderKind::TotalCost => self.generic_over_grid(im_label, |x| s.total_cost(x, integrator)),
            RecorderKind::Deagg => self.over_grid(
                im_label,
                &["mean_nc", "sd_nc", "mean_c", "sd_c"].map(String::from),
                |x| {
                    let d = s.deaggregated_cost(x, integrator)?;
                    Ok(vec![
                        d.non_collapse.mean(),
                        d.non_collapse.sd_ln(),
                        d.collapse.mean(),
                        d.collapse.sd_ln(),
                    ])
                },
            ),
            _ => match self.mode {
                StructCostMode::Annual => {
                    let annual = s.annual_cost(integrator)?;
                    let mut table = Table::new(self.columns.iter().map(Column::label).collect());
                    table.push(cells(self.select(&annual)));
                    Ok(table)
                }
                StructCostMode::ByFate => {
                    let header = prefixed(&["repair", "demolition", "collapse"], &self.columns);
                    self.over_grid(im_label, &header, |x| {
                        let fates = s.costs_by_fate(x, integrator)?;
                        Ok([fates.repair, fates.demolition, fates.collapse]
                            .iter()
                            .flat_map(|d| self.select(d))
                            .collect())
                    })
                }
                StructCostMode::ByEdp | StructCostMode::ByFrag => {
                    let subsets = if self.mode == StructCostMode::ByEdp {
                        s.components_by_edp()
                    } else {
                        s.components_by_fragility()
                    };
                    let keys: Vec<&str> = subsets.iter().map(|(k, _)| k.as_str()).collect();
                    let header = prefixed(&keys, &self.columns);
                    self.over_grid(im_label, &header, |x| {
                        Ok(subsets
                            .iter()
                            .flat_map(|(_, groups)| self.select(&Structure::cost_of(groups, x, integrator)))
                            .collect())
                    })
                }
                StructCostMode::Npv => {
                    let rate = self.options.discount_rate.unwrap_or(0.0);
                    let annual = s.annual_cost(integrator)?.mean();
                    self.over_grid("Year", &["E[ALt]".to_string()], |year| {
                        Ok(vec![discount_factor(year, rate) * annual])
                    })
                }
            },
        }
    }

    /// One row per grid point: the point, then the computed values
    fn over_grid(
        &self,
        x_label: &str,
        labels: &[String],
        mut values: impl FnMut(f64) -> Result<Vec<f64>>,
    ) -> Result<Table> {
        let mut header = Vec::with_capacity(labels.len() + 1);
        header.push(x_label.to_string());
        header.extend(labels.iter().cloned());
        let mut table = Table::new(header);
        for &x in &self.grid {
            let mut row = vec![Cell::Number(x)];
            row.extend(values(x)?.into_iter().map(Cell::Number));
            table.push(row);
        }
        Ok(table)
    }

    /// One row per grid point with the selected columns of a distribution
    fn generic_over_grid(
        &self,
        x_label: &str,
        dist: impl Fn(f64) -> Result<LogNormalDist>,
    ) -> Result<Table> {
        let labels: Vec<String> = self.columns.iter().map(Column::label).collect();
        self.over_grid(x_label, &labels, |x| Ok(self.select(&dist(x)?)))
    }

    fn select(&self, dist: &LogNormalDist) -> Vec<f64> {
        self.columns.iter().map(|c| c.select(dist)).collect()
    }
}

fn ds_labels(states: usize) -> Vec<String> {
    (1..=states)
        .map(|i| format!("DS{}", i))
        .chain(std::iter::once("E(DS)".to_string()))
        .collect()
}

fn with_sum(mut values: Vec<f64>) -> Vec<f64> {
    let total = values.iter().sum();
    values.push(total);
    values
}

fn cells(values: Vec<f64>) -> Vec<Cell> {
    values.into_iter().map(Cell::Number).collect()
}

fn prefixed(prefixes: &[&str], columns: &[Column]) -> Vec<String> {
    prefixes
        .iter()
        .flat_map(|p| columns.iter().map(move |c| format!("{}.{}", p, c.label())))
        .collect()
}

/// Divide a numeric column by its maximum over the table
fn normalise_column(table: &mut Table, index: usize) {
    let max = table.column(index).into_iter().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0 && max.is_finite()) {
        return;
    }
    for row in &mut table.rows {
        if let Some(Cell::Number(v)) = row.get_mut(index) {
            *v /= max;
        }
    }
}
