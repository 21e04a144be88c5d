//! Best-effort reminder delivery.
//!
//! # Responsibility
//! - Route one reminder message through a permission-gated alert channel.
//! - Fall back to a blocking alert when no channel exists.
//!
//! # Invariants
//! - `notify` never fails and never awaits the permission prompt.
//! - A denied permission drops the alert silently.
//! - An undetermined permission triggers an asynchronous request; the alert
//!   is shown later only if the request resolves to `Granted`.

use futures::future::BoxFuture;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Title used for every reminder alert.
pub const REMINDER_TITLE: &str = "Note Reminder!";
/// Icon attached to alerts shown with an already-granted permission.
pub const REMINDER_ICON_URL: &str = "https://cdn-icons-png.flaticon.com/512/1041/1041834.png";

/// Permission state reported by an alert channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not decided yet.
    Default,
}

/// One alert as handed to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
}

impl AlertMessage {
    /// Builds the standard reminder alert for `body`.
    pub fn reminder(body: &str, icon: Option<&str>) -> Self {
        Self {
            title: REMINDER_TITLE.to_string(),
            body: body.to_string(),
            icon: icon.map(str::to_string),
        }
    }
}

/// Delivery failure reported by an alert channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertError {
    message: String,
}

impl AlertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for AlertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "alert delivery failed: {}", self.message)
    }
}

impl Error for AlertError {}

pub type PermissionFuture = BoxFuture<'static, Permission>;

/// Asynchronous, permission-gated alert surface provided by the host.
pub trait AlertChannel: Send + Sync {
    /// Current permission state.
    fn permission(&self) -> Permission;
    /// Asks the user for permission; resolves with the decision.
    fn request_permission(&self) -> PermissionFuture;
    /// Displays one alert.
    fn show(&self, message: &AlertMessage) -> Result<(), AlertError>;
}

/// Synchronous alert used when no alert channel is available.
pub trait BlockingAlert: Send + Sync {
    fn alert(&self, message: &str);
}

/// Outcome of one `notify` call, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the alert channel immediately.
    Shown,
    /// Waiting on a permission request; may still be dropped.
    Deferred,
    /// Permission denied or no runtime to wait on the prompt.
    Dropped,
    /// Shown through the blocking fallback.
    Fallback,
}

/// Reminder sink invoked by the scheduler for each due note.
pub trait Notifier {
    fn notify(&self, message: &str) -> Delivery;
}

/// Notifier backed by a host alert channel with a blocking fallback.
///
/// Used by hosts that run [`ReminderScheduler::run_until`] themselves, such
/// as `remindnote watch`. FFI hosts display alerts on their side instead.
///
/// [`ReminderScheduler::run_until`]: crate::reminder::scheduler::ReminderScheduler::run_until
pub struct ChannelNotifier {
    channel: Option<Arc<dyn AlertChannel>>,
    fallback: Arc<dyn BlockingAlert>,
}

impl ChannelNotifier {
    pub fn new(channel: Arc<dyn AlertChannel>, fallback: Arc<dyn BlockingAlert>) -> Self {
        Self {
            channel: Some(channel),
            fallback,
        }
    }

    /// Builds a notifier for hosts that have no alert channel at all.
    pub fn without_channel(fallback: Arc<dyn BlockingAlert>) -> Self {
        Self {
            channel: None,
            fallback,
        }
    }

    /// Requests alert permission once at startup.
    ///
    /// Hosts call this before starting the scheduler loop.
    ///
    /// Returns the spawned request task, or `None` when there is no channel
    /// or no tokio runtime to drive the request. Calling this when permission
    /// is already decided is harmless.
    pub fn request_permission_on_load(&self) -> Option<JoinHandle<Permission>> {
        let channel = self.channel.as_ref()?;
        spawn_permission_request(Arc::clone(channel), None)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str) -> Delivery {
        let Some(channel) = self.channel.as_ref() else {
            warn!("event=reminder_notify module=notifier status=fallback reason=channel_unavailable");
            self.fallback.alert(&format!("{REMINDER_TITLE}\n{message}"));
            return Delivery::Fallback;
        };

        match channel.permission() {
            Permission::Granted => {
                show_alert(
                    channel.as_ref(),
                    &AlertMessage::reminder(message, Some(REMINDER_ICON_URL)),
                );
                Delivery::Shown
            }
            Permission::Denied => {
                debug!("event=reminder_notify module=notifier status=dropped reason=permission_denied");
                Delivery::Dropped
            }
            Permission::Default => {
                match spawn_permission_request(Arc::clone(channel), Some(message.to_string())) {
                    Some(_) => Delivery::Deferred,
                    None => Delivery::Dropped,
                }
            }
        }
    }
}

fn spawn_permission_request(
    channel: Arc<dyn AlertChannel>,
    pending_body: Option<String>,
) -> Option<JoinHandle<Permission>> {
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("event=permission_request module=notifier status=dropped reason=no_runtime");
            return None;
        }
    };

    Some(handle.spawn(async move {
        let permission = channel.request_permission().await;
        info!(
            "event=permission_request module=notifier status=ok permission={:?} pending_alert={}",
            permission,
            pending_body.is_some()
        );
        if let (Permission::Granted, Some(body)) = (permission, pending_body.as_deref()) {
            show_alert(channel.as_ref(), &AlertMessage::reminder(body, None));
        }
        permission
    }))
}

fn show_alert(channel: &dyn AlertChannel, message: &AlertMessage) {
    match channel.show(message) {
        Ok(()) => debug!("event=reminder_notify module=notifier status=ok"),
        Err(err) => warn!(
            "event=reminder_notify module=notifier status=error error_code=show_failed error={}",
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AlertChannel, AlertError, AlertMessage, BlockingAlert, ChannelNotifier, Delivery,
        Notifier, Permission, PermissionFuture, REMINDER_ICON_URL, REMINDER_TITLE,
    };
    use std::sync::{Arc, Mutex};

    struct FakeChannel {
        permission: Mutex<Permission>,
        answer: Permission,
        requests: Mutex<u32>,
        shown: Mutex<Vec<AlertMessage>>,
        fail_show: bool,
    }

    impl FakeChannel {
        fn new(permission: Permission, answer: Permission) -> Arc<Self> {
            Arc::new(Self {
                permission: Mutex::new(permission),
                answer,
                requests: Mutex::new(0),
                shown: Mutex::new(Vec::new()),
                fail_show: false,
            })
        }

        fn shown(&self) -> Vec<AlertMessage> {
            self.shown.lock().unwrap().clone()
        }

        fn requests(&self) -> u32 {
            *self.requests.lock().unwrap()
        }
    }

    impl AlertChannel for FakeChannel {
        fn permission(&self) -> Permission {
            *self.permission.lock().unwrap()
        }

        fn request_permission(&self) -> PermissionFuture {
            *self.requests.lock().unwrap() += 1;
            *self.permission.lock().unwrap() = self.answer;
            let answer = self.answer;
            Box::pin(async move { answer })
        }

        fn show(&self, message: &AlertMessage) -> Result<(), AlertError> {
            if self.fail_show {
                return Err(AlertError::new("blocked"));
            }
            self.shown.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAlert {
        messages: Mutex<Vec<String>>,
    }

    impl BlockingAlert for FakeAlert {
        fn alert(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn granted_permission_shows_alert_with_icon() {
        let channel = FakeChannel::new(Permission::Granted, Permission::Granted);
        let notifier = ChannelNotifier::new(channel.clone(), Arc::new(FakeAlert::default()));

        assert_eq!(notifier.notify("Buy milk"), Delivery::Shown);
        assert_eq!(
            channel.shown(),
            vec![AlertMessage {
                title: REMINDER_TITLE.to_string(),
                body: "Buy milk".to_string(),
                icon: Some(REMINDER_ICON_URL.to_string()),
            }]
        );
        assert_eq!(channel.requests(), 0);
    }

    #[test]
    fn denied_permission_drops_silently() {
        let channel = FakeChannel::new(Permission::Denied, Permission::Denied);
        let fallback = Arc::new(FakeAlert::default());
        let notifier = ChannelNotifier::new(channel.clone(), fallback.clone());

        assert_eq!(notifier.notify("Buy milk"), Delivery::Dropped);
        assert!(channel.shown().is_empty());
        assert!(fallback.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_channel_uses_blocking_fallback() {
        let fallback = Arc::new(FakeAlert::default());
        let notifier = ChannelNotifier::without_channel(fallback.clone());

        assert_eq!(notifier.notify("Buy milk"), Delivery::Fallback);
        let messages = fallback.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Buy milk"));
        assert!(notifier.request_permission_on_load().is_none());
    }

    #[test]
    fn undetermined_permission_without_runtime_is_dropped() {
        let channel = FakeChannel::new(Permission::Default, Permission::Granted);
        let notifier = ChannelNotifier::new(channel.clone(), Arc::new(FakeAlert::default()));

        assert_eq!(notifier.notify("Buy milk"), Delivery::Dropped);
        assert!(channel.shown().is_empty());
    }

    #[tokio::test]
    async fn undetermined_permission_shows_after_grant_without_icon() {
        let channel = FakeChannel::new(Permission::Default, Permission::Granted);
        let notifier = ChannelNotifier::new(channel.clone(), Arc::new(FakeAlert::default()));

        assert_eq!(notifier.notify("Buy milk"), Delivery::Deferred);
        let startup = notifier
            .request_permission_on_load()
            .expect("runtime is available");
        assert_eq!(startup.await.unwrap(), Permission::Granted);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(
            channel.shown(),
            vec![AlertMessage::reminder("Buy milk", None)]
        );
        assert_eq!(channel.requests(), 2);
    }

    #[tokio::test]
    async fn undetermined_permission_denied_later_shows_nothing() {
        let channel = FakeChannel::new(Permission::Default, Permission::Denied);
        let notifier = ChannelNotifier::new(channel.clone(), Arc::new(FakeAlert::default()));

        assert_eq!(notifier.notify("Buy milk"), Delivery::Deferred);
        let startup = notifier.request_permission_on_load().unwrap();
        assert_eq!(startup.await.unwrap(), Permission::Denied);
        tokio::task::yield_now().await;

        assert!(channel.shown().is_empty());
    }

    #[test]
    fn show_failure_is_swallowed() {
        let channel = Arc::new(FakeChannel {
            permission: Mutex::new(Permission::Granted),
            answer: Permission::Granted,
            requests: Mutex::new(0),
            shown: Mutex::new(Vec::new()),
            fail_show: true,
        });
        let notifier = ChannelNotifier::new(channel, Arc::new(FakeAlert::default()));

        assert_eq!(notifier.notify("Buy milk"), Delivery::Shown);
    }
}
