//! Ordered list of the passes one frame executes
//!
//! The plan is derived from the registered lights and filters alone, so the
//! pass order can be inspected (and tested) without a GPU.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Depth pass of the light at this index in registration order
    Shadow { light: usize },
    /// All objects into the G-buffer
    Geometry,
    /// Additive accumulation of every light into the output target
    Lighting { lights: usize },
    /// Post filter at this index, reading the previous pass's output
    Filter { filter: usize },
    /// Blit of the final texture into the presented view
    Present,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Shadow { light } => write!(f, "shadow[{}]", light),
            Pass::Geometry => write!(f, "geometry"),
            Pass::Lighting { lights } => write!(f, "lighting({})", lights),
            Pass::Filter { filter } => write!(f, "filter[{}]", filter),
            Pass::Present => write!(f, "present"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramePlan {
    passes: Vec<Pass>,
}

impl FramePlan {
    /// Builds the plan for lights with the given depth pass requirements and
    /// `filter_count` filters
    pub fn build(needs_depth_pass: impl IntoIterator<Item = bool>, filter_count: usize) -> Self {
        let mut passes = Vec::new();
        let mut light_count = 0;

        for (light, needs_depth) in needs_depth_pass.into_iter().enumerate() {
            if needs_depth {
                passes.push(Pass::Shadow { light });
            }
            light_count += 1;
        }

        passes.push(Pass::Geometry);
        passes.push(Pass::Lighting {
            lights: light_count,
        });
        passes.extend((0..filter_count).map(|filter| Pass::Filter { filter }));
        passes.push(Pass::Present);

        Self { passes }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Indices of the lights rendering a depth pass, in order
    pub fn shadow_lights(&self) -> impl Iterator<Item = usize> + '_ {
        self.passes.iter().filter_map(|p| match p {
            Pass::Shadow { light } => Some(*light),
            _ => None,
        })
    }

    pub fn filters(&self) -> impl Iterator<Item = usize> + '_ {
        self.passes.iter().filter_map(|p| match p {
            Pass::Filter { filter } => Some(*filter),
            _ => None,
        })
    }

    /// Checks shadow -> geometry -> lighting -> filters -> present
    pub fn is_well_ordered(&self) -> bool {
        fn rank(pass: &Pass) -> usize {
            match pass {
                Pass::Shadow { .. } => 0,
                Pass::Geometry => 1,
                Pass::Lighting { .. } => 2,
                Pass::Filter { .. } => 3,
                Pass::Present => 4,
            }
        }

        let ranks_ordered = self.passes.windows(2).all(|w| rank(&w[0]) <= rank(&w[1]));
        let single = |p: Pass| self.passes.iter().filter(|&&q| q == p).count() == 1;
        let lights_ordered = self
            .shadow_lights()
            .collect::<Vec<_>>()
            .windows(2)
            .all(|w| w[0] < w[1]);
        let filters_ordered = self.filters().enumerate().all(|(i, f)| i == f);

        ranks_ordered
            && single(Pass::Geometry)
            && single(Pass::Present)
            && self.passes.iter().filter(|p| matches!(p, Pass::Lighting { .. })).count() == 1
            && lights_ordered
            && filters_ordered
    }
}

impl fmt::Display for FramePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.passes.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", names.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_empty_scene_plan() {
        let plan = FramePlan::build(std::iter::empty(), 0);
        assert_eq!(
            plan.passes(),
            &[Pass::Geometry, Pass::Lighting { lights: 0 }, Pass::Present]
        );
        assert!(plan.is_well_ordered());
    }

    #[test]
    fn test_ambient_and_spots_with_filters() {
        let plan = FramePlan::build([false, true, true, true], 2);
        assert_eq!(
            plan.passes(),
            &[
                Pass::Shadow { light: 1 },
                Pass::Shadow { light: 2 },
                Pass::Shadow { light: 3 },
                Pass::Geometry,
                Pass::Lighting { lights: 4 },
                Pass::Filter { filter: 0 },
                Pass::Filter { filter: 1 },
                Pass::Present,
            ]
        );
        assert_eq!(
            plan.to_string(),
            "shadow[1] -> shadow[2] -> shadow[3] -> geometry -> lighting(4) -> filter[0] -> filter[1] -> present"
        );
    }

    #[test]
    fn test_random_registrations_are_well_ordered() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let lights: Vec<bool> = (0..rng.random_range(0..8)).map(|_| rng.random_bool(0.5)).collect();
            let filters = rng.random_range(0..5);
            let plan = FramePlan::build(lights.iter().copied(), filters);

            assert!(plan.is_well_ordered(), "{}", plan);
            assert_eq!(plan.shadow_lights().count(), lights.iter().filter(|&&b| b).count());
            assert_eq!(plan.filters().count(), filters);
            assert_eq!(plan.len(), 3 + filters + plan.shadow_lights().count());

            // Same registrations always produce the same plan
            assert_eq!(plan, FramePlan::build(lights.iter().copied(), filters));
        }
    }

    #[test]
    fn test_misordered_plan_is_detected() {
        let plan = FramePlan {
            passes: vec![Pass::Geometry, Pass::Shadow { light: 0 }, Pass::Lighting { lights: 1 }, Pass::Present],
        };
        assert!(!plan.is_well_ordered());
    }
}
