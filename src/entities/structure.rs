//! Structures: building-level aggregation of component groups
//!
//! All groups of a structure share one intensity measure, fixed by the first
//! group added. Losses are split by fate: the building is repaired, demolished
//! or collapses. Repair cost is the sum of the group costs, the other two fates
//! cost the demolition and rebuild costs respectively. Unset demolition or
//! rebuild costs count as zero.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::error::{Result, SlatError};
use crate::entities::compgroup::{discount_factor, ComponentGroup};
use crate::entities::im::IntensityMeasure;
use crate::math::integration::Integrator;
use crate::math::lognormal::LogNormalDist;

/// Loss split by the fate of the building
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FateCosts {
    pub repair: LogNormalDist,
    pub demolition: LogNormalDist,
    pub collapse: LogNormalDist,
}

/// Loss split into the non-collapse and collapse contributions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeaggregatedCost {
    pub non_collapse: LogNormalDist,
    pub collapse: LogNormalDist,
}

#[derive(Debug)]
pub struct Structure {
    id: String,
    groups: RefCell<Vec<Rc<ComponentGroup>>>,
    im: RefCell<Option<Rc<IntensityMeasure>>>,
    rebuild_cost: Cell<Option<LogNormalDist>>,
    demolition_cost: Cell<Option<LogNormalDist>>,
}

impl Structure {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            groups: RefCell::new(Vec::new()),
            im: RefCell::new(None),
            rebuild_cost: Cell::new(None),
            demolition_cost: Cell::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a group. The first group fixes the structure's IM; later
    /// groups must use the same one.
    pub fn add_comp_group(&self, group: Rc<ComponentGroup>) -> Result<()> {
        let group_im = group.im();
        let mut im = self.im.borrow_mut();
        match im.as_ref() {
            Some(existing) if !Rc::ptr_eq(existing, group_im) => {
                return Err(SlatError::InconsistentIm {
                    structure: self.id.clone(),
                    group: group.id().to_string(),
                    expected: existing.id().to_string(),
                    found: group_im.id().to_string(),
                });
            }
            Some(_) => {}
            None => *im = Some(Rc::clone(group_im)),
        }
        self.groups.borrow_mut().push(group);
        Ok(())
    }

    pub fn groups(&self) -> Vec<Rc<ComponentGroup>> {
        self.groups.borrow().clone()
    }

    pub fn im(&self) -> Result<Rc<IntensityMeasure>> {
        self.im
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or_else(|| SlatError::NoComponentGroups {
                id: self.id.clone(),
            })
    }

    pub fn set_rebuild_cost(&self, cost: LogNormalDist) {
        self.rebuild_cost.set(Some(cost));
    }

    pub fn set_demolition_cost(&self, cost: LogNormalDist) {
        self.demolition_cost.set(Some(cost));
    }

    pub fn rebuild_cost(&self) -> LogNormalDist {
        self.rebuild_cost.get().unwrap_or_else(LogNormalDist::zero)
    }

    pub fn demolition_cost(&self) -> LogNormalDist {
        self.demolition_cost.get().unwrap_or_else(LogNormalDist::zero)
    }

    /// Combined cost of a subset of groups at `im`, assuming independence
    pub fn cost_of(groups: &[Rc<ComponentGroup>], im: f64, integrator: &Integrator) -> LogNormalDist {
        let dists: Vec<LogNormalDist> = groups
            .iter()
            .map(|g| g.cost_dist_im(im, integrator))
            .collect();
        LogNormalDist::add(&dists)
    }

    /// Repair cost at `im`, ignoring collapse
    pub fn cost_nc(&self, im: f64, integrator: &Integrator) -> LogNormalDist {
        Self::cost_of(&self.groups.borrow(), im, integrator)
    }

    /// Cost at `im`, mixing in the rebuild cost by collapse probability
    pub fn cost(&self, im: f64, consider_collapse: bool, integrator: &Integrator) -> Result<LogNormalDist> {
        let nc = self.cost_nc(im, integrator);
        if !consider_collapse {
            return Ok(nc);
        }
        let pc = self.im()?.fates(im).collapse;
        Ok(LogNormalDist::mixture([(nc, 1.0 - pc), (self.rebuild_cost(), pc)]))
    }

    /// Cost at `im` over all three fates
    pub fn total_cost(&self, im: f64, integrator: &Integrator) -> Result<LogNormalDist> {
        let fates = self.im()?.fates(im);
        let nc = self.cost_nc(im, integrator);
        Ok(LogNormalDist::mixture([
            (nc, fates.repair),
            (self.demolition_cost(), fates.demolition),
            (self.rebuild_cost(), fates.collapse),
        ]))
    }

    pub fn costs_by_fate(&self, im: f64, integrator: &Integrator) -> Result<FateCosts> {
        let fates = self.im()?.fates(im);
        Ok(FateCosts {
            repair: self.cost_nc(im, integrator).scale(fates.repair),
            demolition: self.demolition_cost().scale(fates.demolition),
            collapse: self.rebuild_cost().scale(fates.collapse),
        })
    }

    pub fn deaggregated_cost(&self, im: f64, integrator: &Integrator) -> Result<DeaggregatedCost> {
        let pc = self.im()?.fates(im).collapse;
        Ok(DeaggregatedCost {
            non_collapse: self.cost_nc(im, integrator).scale(1.0 - pc),
            collapse: self.rebuild_cost().scale(pc),
        })
    }

    /// Density of annual expected loss over IM
    pub fn pdf(&self, im: f64, integrator: &Integrator) -> Result<f64> {
        let hazard = self.im()?;
        Ok(self.total_cost(im, integrator)?.mean() * hazard.hazard_density(im))
    }

    /// Annual loss, moment matched to a log-normal
    pub fn annual_cost(&self, integrator: &Integrator) -> Result<LogNormalDist> {
        let hazard = self.im()?;
        let moment = |power: i32| {
            integrator.integrate(|x| {
                let density = hazard.hazard_density(x);
                if density == 0.0 {
                    return 0.0;
                }
                match self.total_cost(x, integrator) {
                    Ok(d) if power == 1 => density * d.mean(),
                    Ok(d) => density * (d.mean() * d.mean() + d.sd() * d.sd()),
                    Err(_) => f64::NAN,
                }
            })
        };
        let mean = moment(1);
        let second = moment(2);
        let sd = (second - mean * mean).abs().sqrt();
        Ok(LogNormalDist::from_mean_sd(mean, sd))
    }

    /// Expected present value of losses over `years` at discount `rate`
    pub fn e_cost(&self, years: f64, rate: f64, integrator: &Integrator) -> Result<f64> {
        Ok(discount_factor(years, rate) * self.annual_cost(integrator)?.mean())
    }

    /// Groups keyed by EDP id, in order of first appearance
    pub fn components_by_edp(&self) -> Vec<(String, Vec<Rc<ComponentGroup>>)> {
        self.group_by(|g| g.edp().id().to_string())
    }

    /// Groups keyed by fragility id, in order of first appearance
    pub fn components_by_fragility(&self) -> Vec<(String, Vec<Rc<ComponentGroup>>)> {
        self.group_by(|g| g.fragility().id().to_string())
    }

    fn group_by(
        &self,
        key: impl Fn(&ComponentGroup) -> String,
    ) -> Vec<(String, Vec<Rc<ComponentGroup>>)> {
        let mut out: Vec<(String, Vec<Rc<ComponentGroup>>)> = Vec::new();
        for g in self.groups.borrow().iter() {
            let k = key(g);
            match out.iter_mut().find(|(existing, _)| *existing == k) {
                Some((_, members)) => members.push(Rc::clone(g)),
                None => out.push((k, vec![Rc::clone(g)])),
            }
        }
        out
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.groups.borrow();
        let ids: Vec<&str> = groups.iter().map(|g| g.id()).collect();
        write!(f, "{}: groups [{}]", self.id, ids.join(", "))?;
        if let Some(c) = self.rebuild_cost.get() {
            write!(f, ", rebuild {}", c)?;
        }
        if let Some(c) = self.demolition_cost.get() {
            write!(f, ", demolition {}", c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::compgroup::tests::{drift, group, hazard};
    use crate::math::integration::IntegrationConfig;

    fn integrator() -> Integrator {
        Integrator::new(IntegrationConfig::default())
    }

    #[test]
    fn test_first_group_fixes_im() {
        let im = hazard("IM_1");
        let s = Structure::new("BLDG");
        assert!(matches!(s.im(), Err(SlatError::NoComponentGroups { .. })));
        s.add_comp_group(Rc::new(group("CG1", drift("EDP1", Rc::clone(&im)), 2)))
            .unwrap();
        assert!(Rc::ptr_eq(&s.im().unwrap(), &im));
    }

    #[test]
    fn test_inconsistent_im_rejected() {
        let s = Structure::new("BLDG");
        s.add_comp_group(Rc::new(group("CG1", drift("EDP1", hazard("IM_1")), 2)))
            .unwrap();
        let err = s
            .add_comp_group(Rc::new(group("CG2", drift("EDP2", hazard("IM_2")), 2)))
            .unwrap_err();
        assert!(matches!(err, SlatError::InconsistentIm { .. }));
        assert_eq!(s.groups().len(), 1);
    }

    #[test]
    fn test_grouping_keeps_registration_order() {
        let im = hazard("IM_1");
        let edp_b = drift("EDP_B", Rc::clone(&im));
        let edp_a = drift("EDP_A", Rc::clone(&im));
        let s = Structure::new("BLDG");
        s.add_comp_group(Rc::new(group("CG1", Rc::clone(&edp_b), 2))).unwrap();
        s.add_comp_group(Rc::new(group("CG2", Rc::clone(&edp_a), 2))).unwrap();
        s.add_comp_group(Rc::new(group("CG3", Rc::clone(&edp_b), 2))).unwrap();

        let by_edp = s.components_by_edp();
        let keys: Vec<&str> = by_edp.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["EDP_B", "EDP_A"]);
        assert_eq!(by_edp[0].1.len(), 2);
        assert_eq!(s.components_by_fragility().len(), 1);
    }

    #[test]
    fn test_total_cost_without_collapse_is_repair_cost() {
        let im = hazard("IM_1");
        let s = Structure::new("BLDG");
        s.add_comp_group(Rc::new(group("CG1", drift("EDP1", Rc::clone(&im)), 2)))
            .unwrap();
        let integ = integrator();
        let total = s.total_cost(0.8, &integ).unwrap();
        let nc = s.cost_nc(0.8, &integ);
        assert!((total.mean() - nc.mean()).abs() < 1e-12 * nc.mean().max(1.0));
    }

    #[test]
    fn test_fate_costs_add_up_to_total_mean() {
        let im = hazard("IM_1");
        im.set_collapse(LogNormalDist::from_median_sigma_ln(1.2, 0.47)).unwrap();
        im.set_demolition(LogNormalDist::from_median_sigma_ln(0.9, 0.5)).unwrap();
        let s = Structure::new("BLDG");
        s.add_comp_group(Rc::new(group("CG1", drift("EDP1", Rc::clone(&im)), 2)))
            .unwrap();
        s.set_rebuild_cost(LogNormalDist::from_mean_sigma_ln(14.0, 0.35));
        s.set_demolition_cost(LogNormalDist::from_mean_sigma_ln(2.0, 0.35));

        let integ = integrator();
        let x = 1.0;
        let fates = s.costs_by_fate(x, &integ).unwrap();
        let total = s.total_cost(x, &integ).unwrap();
        let sum = fates.repair.mean() + fates.demolition.mean() + fates.collapse.mean();
        assert!((sum - total.mean()).abs() < 1e-9 * total.mean());

        let deagg = s.deaggregated_cost(x, &integ).unwrap();
        let pc = im.p_collapse(x).unwrap();
        assert!((deagg.collapse.mean() - 14.0 * pc).abs() < 1e-9);
    }

    #[test]
    fn test_annual_cost_matches_sum_of_groups() {
        let im = hazard("IM_1");
        let s = Structure::new("BLDG");
        let g1 = Rc::new(group("CG1", drift("EDP1", Rc::clone(&im)), 2));
        let g2 = Rc::new(group("CG2", drift("EDP2", Rc::clone(&im)), 3));
        s.add_comp_group(Rc::clone(&g1)).unwrap();
        s.add_comp_group(Rc::clone(&g2)).unwrap();

        let integ = integrator();
        let annual = s.annual_cost(&integ).unwrap();
        let expected = g1.e_annual_cost(&integ) + g2.e_annual_cost(&integ);
        assert!(
            (annual.mean() - expected).abs() < 1e-2 * expected,
            "{} vs {}",
            annual.mean(),
            expected
        );
    }
}
