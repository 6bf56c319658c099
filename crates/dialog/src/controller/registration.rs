//! Registration of new staff and its approval by the super-admin.

use database::user;
use salon_core::{Role, UserStatus};
use tracing::info;

use super::{stale, use_buttons, Controller, Screen, Turn};
use crate::callback::{Access, Callback};
use crate::error::{DialogError, Result};
use crate::format;
use crate::input::parse_name;
use crate::keyboard::{Button, Keyboard};
use crate::sender::ChatSender;
use crate::state::Step;

/// Roles a user may apply for.
const APPLICABLE: [Role; 2] = [Role::Master, Role::SalonAdmin];

pub(super) fn screen(step: &Step) -> Screen {
    match step {
        Step::AwaitRole { name } => {
            let buttons = APPLICABLE
                .into_iter()
                .map(|role| Button::callback(role.label(), Callback::RegRole(role)))
                .collect();
            Screen::with(
                format!("{name}, what is your role?"),
                Keyboard::new().grid(buttons, 2).nav(),
            )
        }
        Step::AwaitConfirmRegistration { name, role } => Screen::with(
            format!("Name: {name}\nRole: {}\n\nSend the application?", role.label()),
            Keyboard::new()
                .button("✅ Send", Callback::RegConfirm)
                .nav(),
        ),
        _ => Screen::with("Enter your full name:", Keyboard::new().nav()),
    }
}

impl<S: ChatSender> Controller<S> {
    pub(super) async fn start(&self, turn: &Turn<'_>) -> Result<()> {
        if turn.user.is_approved() {
            return self.enter(turn, Step::Idle).await;
        }
        self.enter(turn, Step::AwaitFio).await
    }

    pub(super) async fn registration_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        match turn.step() {
            Step::AwaitFio => {
                let name = parse_name(text)?;
                self.enter(turn, Step::AwaitRole { name }).await
            }
            _ => Err(use_buttons()),
        }
    }

    pub(super) async fn registration_button(&self, turn: &Turn<'_>, cb: Callback) -> Result<()> {
        match (turn.step(), cb) {
            (Step::AwaitRole { name }, Callback::RegRole(role)) if APPLICABLE.contains(&role) => {
                let step = Step::AwaitConfirmRegistration {
                    name: name.clone(),
                    role,
                };
                self.enter(turn, step).await
            }
            (Step::AwaitConfirmRegistration { name, role }, Callback::RegConfirm) => {
                let applicant =
                    user::submit_registration(&self.pool, turn.user.id, name, *role).await?;
                info!(
                    chat_id = turn.chat_id,
                    user_id = applicant.id,
                    role = %applicant.role,
                    "Registration submitted"
                );

                self.finish(
                    turn,
                    "Thank you! Your application was sent to the administrator.",
                    Keyboard::new(),
                )
                .await?;

                let card = Keyboard::new().row(vec![
                    Button::callback("✅ Approve", Callback::UserApprove(applicant.id)),
                    Button::callback("❌ Reject", Callback::UserReject(applicant.id)),
                ]);
                let text =
                    format!("🆕 Registration request\n\n{}", format::user_card(&applicant));
                if let Err(e) = self
                    .sender
                    .send_keyboard(self.settings.admin_chat_id, &text, &card)
                    .await
                {
                    tracing::warn!("Failed to send registration card: {}", e);
                }
                Ok(())
            }
            _ => Err(stale(turn, cb)),
        }
    }

    /// Approve or reject an applicant from the card sent to the super-admin.
    pub(super) async fn decide_registration(
        &self,
        turn: &Turn<'_>,
        user_id: i64,
        approve: bool,
    ) -> Result<()> {
        if super::access_of(&turn.user) != Some(Access::SuperAdmin) {
            return Err(DialogError::AccessDenied);
        }

        let status = if approve {
            UserStatus::Approved
        } else {
            UserStatus::Rejected
        };
        let applicant = user::set_status(&self.pool, user_id, status).await?;
        info!(user_id, %status, "Registration decided");

        if let Some(message_id) = turn.origin_mid {
            self.strip_keyboard(turn.chat_id, Some(message_id)).await;
        }
        self.sender
            .send_text(
                turn.chat_id,
                &format!("{}: {} ({})", status, applicant.name, applicant.role.label()),
            )
            .await?;

        let notice = if approve {
            "✅ Your registration was approved. Send /menu to begin."
        } else {
            "❌ Your registration was rejected."
        };
        if let Err(e) = self.sender.send_text(applicant.chat_id, notice).await {
            tracing::warn!(user_id, "Failed to notify applicant: {}", e);
        }
        Ok(())
    }
}
