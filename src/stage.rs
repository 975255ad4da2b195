//! Pipeline stage identifiers and their degrade policy.
//!
//! The generation pipeline is a fixed four-step sequence. Transitions are
//! strictly sequential; [`PipelineStage::ImagePromptGeneration`] is skipped
//! when the request did not ask for an image.

/// One step in the chained generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Produce the initial slide content from the user prompt.
    ContentGeneration,
    /// Re-evaluate the layout choice against the generated content.
    LayoutRefinement,
    /// Produce a text-to-image prompt for the slide (only when requested).
    ImagePromptGeneration,
    /// Final polish pass over the whole spec.
    FinalRefinement,
}

impl PipelineStage {
    /// Stable stage name for events and error context.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::ContentGeneration => "content-generation",
            PipelineStage::LayoutRefinement => "layout-refinement",
            PipelineStage::ImagePromptGeneration => "image-prompt-generation",
            PipelineStage::FinalRefinement => "final-refinement",
        }
    }

    /// Whether this stage has an offline degrade path when all model
    /// attempts are exhausted. Final refinement has none and propagates a
    /// terminal error instead.
    pub fn has_degrade_path(&self) -> bool {
        !matches!(self, PipelineStage::FinalRefinement)
    }

    /// The full stage sequence for a single-slide run, in order.
    pub fn sequence(with_image: bool) -> Vec<PipelineStage> {
        let mut stages = vec![
            PipelineStage::ContentGeneration,
            PipelineStage::LayoutRefinement,
        ];
        if with_image {
            stages.push(PipelineStage::ImagePromptGeneration);
        }
        stages.push(PipelineStage::FinalRefinement);
        stages
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_with_image() {
        let stages = PipelineStage::sequence(true);
        assert_eq!(
            stages,
            vec![
                PipelineStage::ContentGeneration,
                PipelineStage::LayoutRefinement,
                PipelineStage::ImagePromptGeneration,
                PipelineStage::FinalRefinement,
            ]
        );
    }

    #[test]
    fn sequence_without_image_skips_image_stage() {
        let stages = PipelineStage::sequence(false);
        assert_eq!(stages.len(), 3);
        assert!(!stages.contains(&PipelineStage::ImagePromptGeneration));
    }

    #[test]
    fn only_final_refinement_lacks_degrade_path() {
        assert!(PipelineStage::ContentGeneration.has_degrade_path());
        assert!(PipelineStage::LayoutRefinement.has_degrade_path());
        assert!(PipelineStage::ImagePromptGeneration.has_degrade_path());
        assert!(!PipelineStage::FinalRefinement.has_degrade_path());
    }
}
