//! Command handlers: parse CLI input, call the engine, render output.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use cadence_core::adaptation::AdaptationRequest;
use cadence_core::models::{Draft, Plan, TimeSlot};
use cadence_core::params::{ComposeDraft, SetSlotTimes, SetTimezone};
use cadence_core::{Engine, SessionState};
use clap::Subcommand;

use crate::renderer::TerminalRenderer;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user (idempotent)
    Init {
        user_id: u64,
        /// IANA timezone name
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
    /// Update the user's timezone
    Timezone {
        user_id: u64,
        timezone: String,
    },
    /// Replace the user's daily slot times (HH:MM each)
    Slots {
        user_id: u64,
        #[arg(long)]
        morning: String,
        #[arg(long)]
        day: String,
        #[arg(long)]
        evening: String,
    },
    /// Show or change the user's session state
    State {
        user_id: u64,
        /// Target state; omit to just print the current one
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Compose a new draft (replaces any pending one)
    Create {
        user_id: u64,
        /// SHORT, MEDIUM, STANDARD, or LONG
        #[arg(long)]
        duration: Option<String>,
        /// somatic, cognitive, boundaries, rest, or mixed
        #[arg(long)]
        focus: Option<String>,
        /// LITE, MID, or INTENSIVE
        #[arg(long)]
        load: Option<String>,
        /// Comma-separated preferred time slots (e.g. MORNING,EVENING)
        #[arg(long, value_delimiter = ',')]
        slots: Vec<String>,
        /// Categories the plan must avoid
        #[arg(long, value_delimiter = ',')]
        forbid_category: Vec<String>,
    },
    /// Show the pending draft
    Show { user_id: u64 },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Finalize the pending draft into a live plan
    Activate { user_id: u64 },
    /// Show the user's current plan
    Show { user_id: u64 },
    /// Show the adaptation version log of the current plan
    Versions { user_id: u64 },
    /// Remove one daily time slot (cancels its future steps)
    ReduceLoad {
        user_id: u64,
        /// Time slot to remove
        #[arg(long)]
        slot: String,
    },
    /// Add one daily time slot with new steps
    IncreaseLoad {
        user_id: u64,
        /// Target slot; auto-selected when only one is missing
        #[arg(long)]
        slot: Option<String>,
    },
    /// Swap future exercises one difficulty level down
    LowerDifficulty { user_id: u64 },
    /// Swap future exercises one difficulty level up
    RaiseDifficulty { user_id: u64 },
    /// Shorten the plan to a canonical day count
    Shorten {
        user_id: u64,
        #[arg(long)]
        days: u32,
    },
    /// Extend the plan to a canonical day count
    Extend {
        user_id: u64,
        #[arg(long)]
        days: u32,
    },
    /// Switch the main focus (spawns a new plan, pauses this one)
    ChangeFocus {
        user_id: u64,
        #[arg(long)]
        focus: String,
    },
    /// Pause plan execution
    Pause { user_id: u64 },
    /// Resume a paused plan
    Resume { user_id: u64 },
}

#[derive(Subcommand)]
pub enum StepCommands {
    /// Mark a step as completed
    Complete { step_id: u64 },
    /// Mark a step as skipped
    Skip { step_id: u64 },
}

/// CLI command dispatcher owning the engine and the renderer.
pub struct Cli {
    engine: Engine,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(engine: Engine, renderer: TerminalRenderer) -> Self {
        Self { engine, renderer }
    }

    pub async fn handle_user_command(&self, command: UserCommands) -> Result<()> {
        match command {
            UserCommands::Init { user_id, timezone } => {
                let user = self.engine.ensure_user(user_id, &timezone).await?;
                self.renderer.render(&format!(
                    "# User {}\n\n- Timezone: {}\n- State: {}\n",
                    user.id, user.timezone, user.current_state
                ))
            }
            UserCommands::Timezone { user_id, timezone } => {
                self.engine
                    .set_timezone(&SetTimezone { user_id, timezone })
                    .await?;
                self.renderer.render("Timezone updated.\n")
            }
            UserCommands::Slots {
                user_id,
                morning,
                day,
                evening,
            } => {
                let mut slot_times = BTreeMap::new();
                slot_times.insert("MORNING".to_string(), morning);
                slot_times.insert("DAY".to_string(), day);
                slot_times.insert("EVENING".to_string(), evening);
                let requests = self
                    .engine
                    .set_slot_times(&SetSlotTimes {
                        user_id,
                        slot_times,
                    })
                    .await?;
                self.renderer.render(&format!(
                    "Slot times updated; {} future deliveries rescheduled.\n",
                    requests.len()
                ))
            }
            UserCommands::State { user_id, to } => match to {
                Some(target) => {
                    let state: SessionState = target
                        .parse()
                        .map_err(|e: String| anyhow::anyhow!(e))
                        .context("Invalid target state")?;
                    let user = self.engine.transition_state(user_id, state).await?;
                    self.renderer
                        .render(&format!("State is now **{}**.\n", user.current_state))
                }
                None => {
                    let user = self
                        .engine
                        .get_user(user_id)
                        .await?
                        .context("User not found")?;
                    self.renderer
                        .render(&format!("State: **{}**\n", user.current_state))
                }
            },
        }
    }

    pub async fn handle_draft_command(&self, command: DraftCommands) -> Result<()> {
        match command {
            DraftCommands::Create {
                user_id,
                duration,
                focus,
                load,
                slots,
                forbid_category,
            } => {
                let params = ComposeDraft {
                    user_id,
                    duration: parse_opt(duration.as_deref()).context("Invalid duration")?,
                    focus: parse_opt(focus.as_deref()).context("Invalid focus")?,
                    load: parse_opt(load.as_deref()).context("Invalid load")?,
                    preferred_time_slots: slots
                        .iter()
                        .map(|s| s.parse::<TimeSlot>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| anyhow::anyhow!(e))
                        .context("Invalid time slot")?,
                    forbidden_categories: forbid_category,
                    forbidden_impact_areas: Vec::new(),
                };
                let draft = self.engine.compose_draft(&params).await?;
                self.renderer.render(&draft_preview(&draft))
            }
            DraftCommands::Show { user_id } => {
                match self.engine.get_draft(user_id).await? {
                    Some(draft) => self.renderer.render(&draft_preview(&draft)),
                    None => self.renderer.render("No pending draft.\n"),
                }
            }
        }
    }

    pub async fn handle_plan_command(&self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::Activate { user_id } => {
                let activated = self.engine.activate_plan(user_id).await?;
                self.renderer.render(&format!(
                    "# Plan {} activated\n\n- Starts: {}\n- Days: {}\n- Deliveries scheduled: {}\n",
                    activated.plan.id,
                    activated.plan.start_date,
                    activated.plan.total_days,
                    activated.schedule_requests.len()
                ))
            }
            PlanCommands::Show { user_id } => {
                match self.engine.current_plan(user_id).await? {
                    Some(plan) => self.renderer.render(&plan_summary(&plan)),
                    None => self.renderer.render("No live plan.\n"),
                }
            }
            PlanCommands::Versions { user_id } => {
                let plan = self
                    .engine
                    .current_plan(user_id)
                    .await?
                    .context("No live plan")?;
                let versions = self.engine.plan_versions(plan.id).await?;
                let mut out = format!("# Plan {} version log\n\n", plan.id);
                for version in &versions {
                    out.push_str(&format!(
                        "- v{} · {} · {}\n",
                        version.id, version.adaptation_type, version.created_at
                    ));
                }
                if versions.is_empty() {
                    out.push_str("No adaptations applied yet.\n");
                }
                self.renderer.render(&out)
            }
            PlanCommands::ReduceLoad { user_id, slot } => {
                let slot = parse_slot(&slot)?;
                self.adapt(user_id, AdaptationRequest::ReduceLoad {
                    slot_to_remove: slot,
                })
                .await
            }
            PlanCommands::IncreaseLoad { user_id, slot } => {
                let slot_to_add = slot.as_deref().map(parse_slot).transpose()?;
                self.adapt(user_id, AdaptationRequest::IncreaseLoad { slot_to_add })
                    .await
            }
            PlanCommands::LowerDifficulty { user_id } => {
                self.adapt(user_id, AdaptationRequest::LowerDifficulty).await
            }
            PlanCommands::RaiseDifficulty { user_id } => {
                self.adapt(user_id, AdaptationRequest::RaiseDifficulty).await
            }
            PlanCommands::Shorten { user_id, days } => {
                self.adapt(user_id, AdaptationRequest::ShortenDuration { target_days: days })
                    .await
            }
            PlanCommands::Extend { user_id, days } => {
                self.adapt(user_id, AdaptationRequest::ExtendDuration { target_days: days })
                    .await
            }
            PlanCommands::ChangeFocus { user_id, focus } => {
                let new_focus = focus
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .context("Invalid focus")?;
                self.adapt(user_id, AdaptationRequest::ChangeFocus { new_focus })
                    .await
            }
            PlanCommands::Pause { user_id } => {
                self.adapt(user_id, AdaptationRequest::Pause).await
            }
            PlanCommands::Resume { user_id } => {
                self.adapt(user_id, AdaptationRequest::Resume).await
            }
        }
    }

    pub async fn handle_step_command(&self, command: StepCommands) -> Result<()> {
        match command {
            StepCommands::Complete { step_id } => {
                let step = self.engine.complete_step(step_id).await?;
                self.renderer
                    .render(&format!("Step {} completed.\n", step.id))
            }
            StepCommands::Skip { step_id } => {
                let step = self.engine.skip_step(step_id).await?;
                self.renderer.render(&format!("Step {} skipped.\n", step.id))
            }
        }
    }

    async fn adapt(&self, user_id: u64, request: AdaptationRequest) -> Result<()> {
        let applied = self.engine.adapt(user_id, request).await?;
        let mut out = format!(
            "# {} applied (plan {}, version {})\n\n",
            applied.outcome.intent, applied.plan.id, applied.plan.adaptation_version
        );
        if !applied.outcome.canceled_step_ids.is_empty() {
            out.push_str(&format!(
                "- Cancelled steps: {:?}\n",
                applied.outcome.canceled_step_ids
            ));
        }
        if !applied.outcome.added_step_ids.is_empty() {
            out.push_str(&format!(
                "- Added steps: {:?}\n",
                applied.outcome.added_step_ids
            ));
        }
        if !applied.schedule_requests.is_empty() {
            out.push_str(&format!(
                "- Deliveries to arrange: {}\n",
                applied.schedule_requests.len()
            ));
        }
        if let Some(new_plan) = &applied.new_plan {
            out.push_str(&format!(
                "- New plan {} ({}) is now active\n",
                new_plan.id, new_plan.focus
            ));
        }
        self.renderer.render(&out)
    }
}

fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))
}

fn parse_slot(value: &str) -> Result<TimeSlot> {
    value
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("Invalid time slot")
}

/// Confirmation card for a composed draft: parameters, a handful of
/// sample steps, and its validation status.
fn draft_preview(draft: &Draft) -> String {
    let mut out = String::new();
    out.push_str("# Draft plan (not active yet)\n\n");
    out.push_str("## Parameters\n\n");
    out.push_str(&format!("- Duration: {} ({} days)\n", draft.duration, draft.total_days));
    out.push_str(&format!("- Focus: {}\n", draft.focus));
    out.push_str(&format!("- Load: {}\n", draft.load));
    out.push_str(&format!("- Steps: {}\n", draft.total_steps()));

    out.push_str("\n## Sample steps\n\n");
    for step in draft.steps.iter().take(5) {
        out.push_str(&format!(
            "- Day {} · {} · {} ({})\n",
            step.day_number, step.time_slot, step.exercise_name, step.category
        ));
    }

    if draft.is_valid() {
        out.push_str("\nThis plan is not active yet. Activate it to start.\n");
    } else {
        out.push_str("\n**Validation errors:**\n");
        for error in &draft.validation_errors {
            out.push_str(&format!("- {error}\n"));
        }
    }
    out
}

fn plan_summary(plan: &Plan) -> String {
    let total_steps: usize = plan.days.iter().map(|d| d.steps.len()).sum();
    let completed: usize = plan
        .days
        .iter()
        .flat_map(|d| d.steps.iter())
        .filter(|s| s.is_completed)
        .count();
    let mut out = format!("# Plan {} ({})\n\n", plan.id, plan.status.as_str());
    out.push_str(&format!(
        "- {} · {} · {}\n",
        plan.duration, plan.focus, plan.load
    ));
    out.push_str(&format!(
        "- Day {}/{} · {}/{} steps completed\n",
        plan.current_day, plan.total_days, completed, total_steps
    ));
    out.push_str(&format!(
        "- Slots: {}\n",
        plan.preferred_time_slots
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    out.push_str(&format!("- Adaptation version: {}\n", plan.adaptation_version));
    out
}
