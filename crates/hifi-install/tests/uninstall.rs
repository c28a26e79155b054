mod common;

use common::Sandbox;
use hifi_install::reversal::ReversalStep;
use hifi_install::{ReversalOrchestrator, StepOutcome, UninstallPlan};
use hifi_platform::DistroKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn touch(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Everything a full install and a few agent runs leave behind.
fn populate(sandbox: &Sandbox) {
    let layout = &sandbox.layout;
    common::write_exe(&layout.installed_binary, b"bin");
    touch(&layout.install_dir.join("state.json"), "{}");
    touch(&layout.system_unit, "[Unit]\n");
    touch(&layout.user_repair_unit(&sandbox.home), "[Unit]\n");
    touch(&layout.polkit_rule, "polkit.addRule(function() {});\n");
    touch(&layout.linger_dir.join("deck"), "");
    touch(&layout.config_dir.join("config.toml"), "");
    for conf in layout.modprobe_confs() {
        touch(&conf, "options x y=1\n");
    }
    touch(&layout.sysctl_conf, "net.core.rmem_max=1\n");
    std::fs::create_dir_all(layout.alias.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink(&layout.installed_binary, &layout.alias).unwrap();
    for iface in ["wlan0", "enp3s0", "lo"] {
        std::fs::create_dir_all(layout.net_class.join(iface)).unwrap();
    }
    touch(
        &sandbox.home.join(".bashrc"),
        &format!(
            "alias ll='ls -l'\n# Added by hifi-wifi\nexport PATH=\"$PATH:{}\"\n",
            layout.install_dir.display()
        ),
    );
}

#[test]
fn test_only_system_unit_present() {
    let sandbox = Sandbox::new(DistroKind::Arch);
    touch(&sandbox.layout.system_unit, "[Unit]\n");
    let runner = sandbox.runner();
    let ctx = sandbox.context(&runner);

    let report = ReversalOrchestrator::new(&ctx).execute(&UninstallPlan::new(false));

    assert!(report.is_clean());
    assert!(!sandbox.layout.system_unit.exists());
    assert_eq!(runner.count("systemctl", &["daemon-reload"]), 1);
    assert_eq!(runner.count("systemctl", &["stop"]), 0);
    assert!(matches!(
        report.outcome(ReversalStep::RemoveInstallRoot),
        Some(StepOutcome::Ignored(_))
    ));
    assert!(matches!(
        report.outcome(ReversalStep::RemoveSystemUnit),
        Some(StepOutcome::Done(_))
    ));
}

#[test]
fn test_full_teardown_then_again() {
    let sandbox = Sandbox::new(DistroKind::SteamOs);
    populate(&sandbox);
    let runner = sandbox.runner();
    runner.service_running();
    runner.qdisc("wlan0", r#"[{"kind":"cake","handle":"8001:","root":true}]"#);
    runner.qdisc("enp3s0", r#"[{"kind":"fq_codel","handle":"0:","root":true}]"#);
    let ctx = sandbox.context(&runner);
    let plan = UninstallPlan::new(true);
    let layout = &sandbox.layout;

    let first = ReversalOrchestrator::new(&ctx).execute(&plan);
    assert!(first.is_clean());
    for gone in [
        &layout.install_dir,
        &layout.system_unit,
        &layout.polkit_rule,
        &layout.config_dir,
        &layout.sysctl_conf,
        &layout.user_repair_unit(&sandbox.home),
    ] {
        assert!(!gone.exists(), "{} still present", gone.display());
    }
    assert!(layout.modprobe_confs().all(|p| !p.exists()));
    assert!(!hifi_fs::link_exists(&layout.alias));
    assert_eq!(runner.count("systemctl", &["stop", "hifi-wifi.service"]), 1);
    assert_eq!(runner.count("systemctl", &["disable", "hifi-wifi.service"]), 1);
    assert_eq!(
        runner.count("systemctl", &["--user", "disable", "--now", "hifi-wifi-repair.service"]),
        1
    );
    assert_eq!(runner.count("loginctl", &["disable-linger", "deck"]), 1);
    assert_eq!(runner.count("tc", &["qdisc", "del", "dev", "wlan0", "root"]), 1);
    assert_eq!(runner.count("tc", &["qdisc", "del"]), 1);
    assert_eq!(runner.count("tc", &["-j", "qdisc", "show", "dev", "lo"]), 0);
    assert_eq!(runner.count("steamos-readonly", &["disable"]), 1);
    assert_eq!(runner.count("steamos-readonly", &["enable"]), 1);
    assert_eq!(
        std::fs::read_to_string(sandbox.home.join(".bashrc")).unwrap(),
        "alias ll='ls -l'\n"
    );

    runner.clear();
    let second = ReversalOrchestrator::new(&ctx).execute(&plan);
    assert!(second.is_clean());
    assert!(second.steps.iter().all(|r| matches!(r.result, Ok(StepOutcome::Ignored(_)))));
    assert_eq!(runner.count("steamos-readonly", &[]), 0);
    assert_eq!(runner.count("tc", &["qdisc", "del"]), 0);
}

#[test]
fn test_config_kept_without_purge() {
    let sandbox = Sandbox::new(DistroKind::Debian);
    touch(&sandbox.layout.config_dir.join("config.toml"), "");
    let runner = sandbox.runner();
    let ctx = sandbox.context(&runner);

    let report = ReversalOrchestrator::new(&ctx).execute(&UninstallPlan::new(false));

    assert!(report.is_clean());
    assert!(sandbox.layout.config_dir.join("config.toml").exists());
}

#[test]
fn test_failing_removal_does_not_stop_the_rest() {
    let sandbox = Sandbox::new(DistroKind::Arch);
    populate(&sandbox);
    // a read-only modprobe.d makes every fragment removal fail
    let modprobe_dir = sandbox.layout.modprobe_dir.clone();
    std::fs::set_permissions(&modprobe_dir, std::fs::Permissions::from_mode(0o500)).unwrap();
    let runner = sandbox.runner();
    let ctx = sandbox.context(&runner);

    let report = ReversalOrchestrator::new(&ctx).execute(&UninstallPlan::new(false));
    std::fs::set_permissions(&modprobe_dir, std::fs::Permissions::from_mode(0o755)).unwrap();

    if nix::unistd::geteuid().is_root() {
        // root ignores directory permissions
        assert!(report.is_clean());
    } else {
        let failed: Vec<ReversalStep> = report.failures().map(|(step, _)| step).collect();
        assert_eq!(failed, vec![ReversalStep::RemoveDriverConfigs]);
        assert!(sandbox.layout.modprobe_confs().all(|p| p.exists()));
    }
    // the sysctl fragment shares the failing step and is still removed
    assert!(!sandbox.layout.sysctl_conf.exists());
    assert!(!hifi_fs::link_exists(&sandbox.layout.alias));
    assert!(report.outcome(ReversalStep::DetachQdiscs).is_some());
}

#[test]
fn test_profile_stripping_is_byte_exact() {
    let sandbox = Sandbox::new(DistroKind::Arch);
    let install_dir = sandbox.layout.install_dir.display().to_string();
    let bashrc = sandbox.home.join(".bashrc");
    let zshrc = sandbox.home.join(".zshrc");
    let profile = sandbox.home.join(".profile");

    let bashrc_before = format!(
        "# ~/.bashrc\r\n\
         export PATH=\"$HOME/.local/bin:$PATH\"\n\
         \n\
         # Added by hifi-wifi\n\
         export PATH=\"$PATH:{install_dir}\"\n\
         export PATH=\"$PATH:{install_dir}-tools\"\n\
         \tPS1='\\u@\\h '   \n\
         no-trailing-newline"
    );
    touch(&bashrc, &bashrc_before);
    std::fs::set_permissions(&bashrc, std::fs::Permissions::from_mode(0o600)).unwrap();
    let zshrc_before = "export PATH=\"$PATH:/opt/other/bin\"\n";
    touch(&zshrc, zshrc_before);
    touch(&profile, &format!("PATH=\"{install_dir}:$PATH\"\n"));

    let runner = sandbox.runner();
    let ctx = sandbox.context(&runner);
    let outcome = hifi_install::shell_profile::strip_exports(&ctx).unwrap();

    assert!(outcome.is_done());
    assert_eq!(
        std::fs::read_to_string(&bashrc).unwrap(),
        format!(
            "# ~/.bashrc\r\n\
             export PATH=\"$HOME/.local/bin:$PATH\"\n\
             \n\
             export PATH=\"$PATH:{install_dir}-tools\"\n\
             \tPS1='\\u@\\h '   \n\
             no-trailing-newline"
        )
    );
    let mode = std::fs::metadata(&bashrc).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(std::fs::read_to_string(&zshrc).unwrap(), zshrc_before);
    assert_eq!(std::fs::read_to_string(&profile).unwrap(), "");
}

#[test]
fn test_symlinked_profile_is_cleaned_in_place() {
    let sandbox = Sandbox::new(DistroKind::Arch);
    let install_dir = sandbox.layout.install_dir.display().to_string();
    let real = sandbox.home.join("dotfiles/bashrc");
    touch(
        &real,
        &format!("alias ll='ls -l'\n# Added by hifi-wifi\nexport PATH=\"$PATH:{install_dir}\"\n"),
    );
    let bashrc = sandbox.home.join(".bashrc");
    std::os::unix::fs::symlink("dotfiles/bashrc", &bashrc).unwrap();

    let runner = sandbox.runner();
    let ctx = sandbox.context(&runner);
    let outcome = hifi_install::shell_profile::strip_exports(&ctx).unwrap();

    assert!(outcome.is_done());
    assert!(std::fs::symlink_metadata(&bashrc).unwrap().file_type().is_symlink());
    assert_eq!(std::fs::read_to_string(&real).unwrap(), "alias ll='ls -l'\n");
}
