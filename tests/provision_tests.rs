mod common;

use bitswitch_config::core::communication::{ControlLine, DeviceMode, Verification};
use bitswitch_config::core::session::{
    run_session, ProvisionReport, ProvisionSession, RecoveryChoice, ResetMethod, SessionEvent,
};
use bitswitch_config::domain::settings::FinalizeBehavior;
use bitswitch_config::{ProvisionError, ProvisionResult, ProvisionerSettings};
use common::{lock, sample_record, ScriptedOperator, SimHandle, SimMode, SimulatedDevice};
use std::time::Duration;

/// Provisioning flow tests against a simulated device
#[cfg(test)]
mod provision_tests {
    use super::*;

    async fn provision_with(
        device: SimulatedDevice,
        settings: ProvisionerSettings,
        operator: &mut ScriptedOperator,
    ) -> ProvisionResult<ProvisionReport> {
        let session = ProvisionSession::new(device, settings);
        run_session(session, &sample_record(), operator, std::future::pending::<()>()).await
    }

    fn written(handle: &SimHandle) -> Vec<String> {
        lock(handle).written.clone()
    }

    fn sent_any(handle: &SimHandle, prefix: &str) -> bool {
        written(handle).iter().any(|line| line.starts_with(prefix))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_writes_verifies_and_finalizes() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let mut operator = ScriptedOperator::new(&[]);
        let record = sample_record();

        let report = provision_with(device, ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();

        assert_eq!(report.parameters, record.parameter_count());
        assert_eq!(
            report.verification,
            Verification::Valid { parameters: record.parameter_count() }
        );
        assert_eq!(report.finalize, FinalizeBehavior::ExitConfigMode);
        assert_eq!(operator.menus_shown, 0);

        let lines = written(&handle);
        assert_eq!(lines.first().map(String::as_str), Some("/file-list"));
        assert_eq!(lines[1], "/file-remove");
        assert_eq!(lines[2], "/file-append [");
        assert!(lines.contains(&"/file-append ]".to_string()));
        assert!(lines.contains(&"/file-read /elements.json".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("/config-done"));

        let state = lock(&handle);
        assert_eq!(state.closes, 1);
        assert_eq!(state.stored_file.len(), record.parameter_count() + 2);
        assert!(state.stored_file.iter().all(|line| !line.contains("_comment")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_have_trailing_commas_except_last() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let mut operator = ScriptedOperator::new(&[]);

        provision_with(device, ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();

        let stored = lock(&handle).stored_file.clone();
        let entries = &stored[1..stored.len() - 1];
        let (last, rest) = entries.split_last().unwrap();

        assert!(rest.iter().all(|line| line.ends_with("},")));
        assert!(last.ends_with('}'));
        assert!(stored.contains(&r#"{"name":"logging_enabled","value":"true"},"#.to_string()));
        assert!(stored.contains(&r#"{"name":"syslog_port","value":"514"}"#.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reported_every_third_entry_and_at_end() {
        let (device, _handle) = SimulatedDevice::new(SimMode::Config);
        let mut operator = ScriptedOperator::new(&[]);

        provision_with(device, ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();

        let progress: Vec<_> = operator
            .events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Progress { written, total } => Some((*written, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(3, 6), (6, 6)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_runs_send_identical_commands() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let mut operator = ScriptedOperator::new(&[]);
        provision_with(device, ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();
        let first_run = written(&handle);
        let first_file = lock(&handle).stored_file.clone();

        lock(&handle).written.clear();
        let mut operator = ScriptedOperator::new(&[]);
        provision_with(SimulatedDevice::attach(&handle), ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();

        assert_eq!(written(&handle), first_run);
        assert_eq!(lock(&handle).stored_file, first_file);
        assert_eq!(lock(&handle).closes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_abort_sends_nothing_destructive() {
        let (device, handle) = SimulatedDevice::new(SimMode::Silent);
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Abort]);

        let result = provision_with(device, ProvisionerSettings::default(), &mut operator).await;

        assert!(matches!(result, Err(ProvisionError::Cancelled)));
        assert!(!sent_any(&handle, "/file-remove"));
        assert!(!sent_any(&handle, "/file-append"));
        assert_eq!(lock(&handle).closes, 1);

        let probe = operator.events.iter().find_map(|event| match event {
            SessionEvent::ModeDetected(probe) => Some(probe.clone()),
            _ => None,
        });
        let probe = probe.unwrap();
        assert_eq!(probe.mode, DeviceMode::Unknown);
        assert_eq!(probe.status_message(), "No response from device");
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_device_detected() {
        let (device, handle) = SimulatedDevice::new(SimMode::Running);
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Abort]);

        let result = provision_with(device, ProvisionerSettings::default(), &mut operator).await;

        assert!(matches!(result, Err(ProvisionError::Cancelled)));
        assert!(operator.events.iter().any(|event| matches!(
            event,
            SessionEvent::ModeDetected(probe) if probe.mode == DeviceMode::Running
        )));
        assert!(!sent_any(&handle, "/file-append"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_software_reset_recovers_config_mode() {
        let (device, handle) = SimulatedDevice::new(SimMode::Running);
        lock(&handle).acknowledges_reset = true;
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Reset]);

        let report = provision_with(device, ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();

        assert!(matches!(report.verification, Verification::Valid { .. }));
        assert!(sent_any(&handle, "/reset"));
        assert!(lock(&handle).control_changes.is_empty());
        assert!(operator.events.contains(&SessionEvent::ResetOutcome {
            method: ResetMethod::Software,
            success: true,
            detail: None,
        }));
        assert!(!operator
            .events
            .contains(&SessionEvent::ResetAttempt(ResetMethod::Hardware)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hardware_reset_follows_unanswered_software_reset() {
        let (device, handle) = SimulatedDevice::new(SimMode::Running);
        lock(&handle).hardware_reset_enters_config = true;
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Reset]);

        provision_with(device, ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();

        assert_eq!(
            lock(&handle).control_changes,
            vec![
                (ControlLine::Dtr, false),
                (ControlLine::Rts, true),
                (ControlLine::Rts, false),
                (ControlLine::Dtr, true),
            ]
        );
        assert!(operator.events.contains(&SessionEvent::ResetOutcome {
            method: ResetMethod::Software,
            success: false,
            detail: None,
        }));
        assert!(operator.events.contains(&SessionEvent::ResetOutcome {
            method: ResetMethod::Hardware,
            success: true,
            detail: None,
        }));
        assert!(sent_any(&handle, "/config-done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_hardware_reset_returns_to_menu() {
        let (device, handle) = SimulatedDevice::new(SimMode::Running);
        lock(&handle).fail_control_lines = true;
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Reset, RecoveryChoice::Abort]);

        let result = provision_with(device, ProvisionerSettings::default(), &mut operator).await;

        assert!(matches!(result, Err(ProvisionError::Cancelled)));
        assert_eq!(operator.menus_shown, 2);
        assert!(operator.events.iter().any(|event| matches!(
            event,
            SessionEvent::ResetOutcome { method: ResetMethod::Hardware, success: false, detail: Some(_) }
        )));
        assert_eq!(lock(&handle).closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_without_config_mode_hints_power_cycle() {
        let (device, handle) = SimulatedDevice::new(SimMode::Running);
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Reset, RecoveryChoice::Abort]);

        let result = provision_with(device, ProvisionerSettings::default(), &mut operator).await;

        assert!(matches!(result, Err(ProvisionError::Cancelled)));
        assert!(operator.events.contains(&SessionEvent::PowerCycleHint));
        assert_eq!(lock(&handle).control_changes.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_choice_pauses_then_probes_again() {
        let (device, handle) = SimulatedDevice::new(SimMode::Running);
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Wait, RecoveryChoice::Abort]);

        let result = provision_with(device, ProvisionerSettings::default(), &mut operator).await;

        assert!(matches!(result, Err(ProvisionError::Cancelled)));
        assert!(operator
            .events
            .contains(&SessionEvent::Waiting(Duration::from_secs(10))));
        let probes = written(&handle).iter().filter(|line| *line == "/file-list").count();
        assert_eq!(probes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_choice_probes_again() {
        let (device, handle) = SimulatedDevice::new(SimMode::Silent);
        let mut operator = ScriptedOperator::new(&[RecoveryChoice::Retry, RecoveryChoice::Abort]);

        let result = provision_with(device, ProvisionerSettings::default(), &mut operator).await;

        assert!(matches!(result, Err(ProvisionError::Cancelled)));
        assert_eq!(operator.menus_shown, 2);
        assert_eq!(written(&handle), vec!["/file-list", "/file-list"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_detection_disabled_skips_probe() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let mut settings = ProvisionerSettings::default();
        settings.protocol.mode_detection = false;
        let mut operator = ScriptedOperator::new(&[]);

        provision_with(device, settings, &mut operator).await.unwrap();

        let lines = written(&handle);
        assert_eq!(lines.first().map(String::as_str), Some("/file-remove"));
        assert!(!lines.contains(&"/file-list".to_string()));
        assert!(!operator.events.contains(&SessionEvent::Probing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_file_paths() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let mut settings = ProvisionerSettings::default();
        settings.protocol.remove_path = Some("/config.json".to_string());
        settings.protocol.read_path = "/config.json".to_string();
        let mut operator = ScriptedOperator::new(&[]);

        provision_with(device, settings, &mut operator).await.unwrap();

        let lines = written(&handle);
        assert!(lines.contains(&"/file-remove /config.json".to_string()));
        assert!(lines.contains(&"/file-read /config.json".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reboot_finalize_reported() {
        let (device, _handle) = SimulatedDevice::new(SimMode::Config);
        let mut settings = ProvisionerSettings::default();
        settings.protocol.finalize = FinalizeBehavior::Reboot;
        let mut operator = ScriptedOperator::new(&[]);

        let report = provision_with(device, settings, &mut operator).await.unwrap();

        assert_eq!(report.finalize, FinalizeBehavior::Reboot);
        assert_eq!(
            operator.events.last(),
            Some(&SessionEvent::Completed(FinalizeBehavior::Reboot))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_read_back_does_not_block_completion() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        lock(&handle).corrupt_read_back = true;
        let mut operator = ScriptedOperator::new(&[]);

        let report = provision_with(device, ProvisionerSettings::default(), &mut operator)
            .await
            .unwrap();

        assert!(matches!(report.verification, Verification::Malformed { .. }));
        assert!(sent_any(&handle, "/config-done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_session_closes_link() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let session = ProvisionSession::new(device, ProvisionerSettings::default());
        let mut operator = ScriptedOperator::new(&[]);

        // fires during the mode probe window
        let cancel = tokio::time::sleep(Duration::from_millis(2000));
        let result = run_session(session, &sample_record(), &mut operator, cancel).await;

        assert!(matches!(result, Err(ProvisionError::Interrupted)));
        assert!(!sent_any(&handle, "/file-append"));
        assert_eq!(lock(&handle).closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let mut session = ProvisionSession::new(device, ProvisionerSettings::default());

        session.close().await.unwrap();
        session.close().await.unwrap();

        assert!(session.state().is_closed());
        assert_eq!(lock(&handle).closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_io_after_close_is_rejected() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        let mut session = ProvisionSession::new(device, ProvisionerSettings::default());
        let mut operator = ScriptedOperator::new(&[]);

        session.close().await.unwrap();
        let result = session.probe_mode(&mut operator).await;

        assert!(result.is_err());
        assert!(written(&handle).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_completes_against_chatty_running_device() {
        let (device, handle) = SimulatedDevice::new(SimMode::Running);
        lock(&handle).chatter = Some("[wifi] RSSI -61 dBm".to_string());
        let mut session = ProvisionSession::new(device, ProvisionerSettings::default());
        let mut operator = ScriptedOperator::new(&[]);

        let started = tokio::time::Instant::now();
        let reset = tokio::time::timeout(
            Duration::from_secs(60),
            session.reset_device(&mut operator),
        )
        .await;

        assert!(reset.is_ok(), "reset did not finish against a chatty device");
        assert!(reset.unwrap().unwrap());
        assert!(started.elapsed() < Duration::from_secs(15));
        assert!(operator.events.contains(&SessionEvent::ResetAttempt(ResetMethod::Hardware)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_completes_while_device_keeps_logging() {
        let (device, handle) = SimulatedDevice::new(SimMode::Config);
        lock(&handle).chatter = Some("heap free: 182344".to_string());
        let mut operator = ScriptedOperator::new(&[]);

        let outcome = tokio::time::timeout(
            Duration::from_secs(300),
            provision_with(device, ProvisionerSettings::default(), &mut operator),
        )
        .await;

        let report = outcome.expect("provisioning did not finish").unwrap();
        assert!(matches!(report.verification, Verification::Valid { .. }));
        assert!(sent_any(&handle, "/config-done"));
        assert_eq!(lock(&handle).closes, 1);
    }
}
