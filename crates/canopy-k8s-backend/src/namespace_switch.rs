//! Interactive namespace switching.

use canopy_explorer::{Interaction, NotifyLevel};

use crate::error::KubeError;
use crate::kubeconfig::Kubeconfig;

const PICK_TITLE: &str = "What namespace do you want to use?";
const INPUT_PLACEHOLDER: &str =
    "Enter the namespace to switch to or press enter to select from available list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSwitch {
    Switched(String),
    Unchanged,
    Cancelled,
}

/// Picked entries may come as `kind/name`; the namespace is the part after the last `/`.
pub fn namespace_from_selection(selection: &str) -> &str {
    match selection.rfind('/') {
        Some(idx) => &selection[idx + 1..],
        None => selection,
    }
}

/// Switches the current context's namespace.
///
/// `preferred` (a namespace node the user acted on) switches directly. Otherwise the
/// user types a namespace, or with `prefer_pick` (or an empty answer) picks one of
/// `candidates`, the current namespace left out. Picking the current namespace is a no-op.
pub async fn use_namespace(
    kubeconfig: &mut Kubeconfig,
    ui: &dyn Interaction,
    candidates: &[String],
    preferred: Option<&str>,
    prefer_pick: bool,
) -> Result<NamespaceSwitch, KubeError> {
    if let Some(namespace) = preferred.filter(|ns| !ns.is_empty()) {
        return switch_to(kubeconfig, ui, namespace).await;
    }

    let current = kubeconfig.current_namespace();
    let typed = if prefer_pick {
        None
    } else {
        ui.input(PICK_TITLE, INPUT_PLACEHOLDER)
            .await
            .filter(|answer| !answer.trim().is_empty())
    };
    let selection = match typed {
        Some(answer) => answer.trim().to_owned(),
        None => {
            let options = candidates
                .iter()
                .filter(|ns| **ns != current)
                .map(|ns| format!("namespace/{ns}"))
                .collect();
            match ui.pick_one(PICK_TITLE, options).await {
                Some(picked) => picked,
                None => return Ok(NamespaceSwitch::Cancelled),
            }
        }
    };

    let namespace = namespace_from_selection(&selection);
    if namespace.is_empty() || namespace == current {
        return Ok(NamespaceSwitch::Unchanged);
    }
    switch_to(kubeconfig, ui, namespace).await
}

async fn switch_to(
    kubeconfig: &mut Kubeconfig,
    ui: &dyn Interaction,
    namespace: &str,
) -> Result<NamespaceSwitch, KubeError> {
    kubeconfig.switch_namespace(namespace).await?;
    ui.notify(
        NotifyLevel::Info,
        &format!("Switched to namespace {namespace}"),
    );
    Ok(NamespaceSwitch::Switched(namespace.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeUi {
        typed: Option<String>,
        picked: Option<String>,
        offered: Mutex<Vec<String>>,
        toasts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Interaction for FakeUi {
        async fn input(&self, _prompt: &str, _placeholder: &str) -> Option<String> {
            self.typed.clone()
        }
        async fn pick_one(&self, _title: &str, options: Vec<String>) -> Option<String> {
            *self.offered.lock().unwrap() = options;
            self.picked.clone()
        }
        async fn pick_many(&self, _title: &str, _options: Vec<String>) -> Option<Vec<String>> {
            None
        }
        async fn confirm(&self, _prompt: &str) -> bool {
            false
        }
        fn notify(&self, _level: NotifyLevel, message: &str) {
            self.toasts.lock().unwrap().push(message.to_owned());
        }
    }

    async fn kubeconfig(namespace: &str) -> (tempfile::TempDir, Kubeconfig) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        let raw = format!(
            "current-context: dev\ncontexts:\n- name: dev\n  context:\n    cluster: c\n    namespace: {namespace}\n"
        );
        tokio::fs::write(&path, raw).await.unwrap();
        let config = Kubeconfig::load(&path).await.unwrap();
        (dir, config)
    }

    fn namespaces() -> Vec<String> {
        ["default", "kube-system", "payments"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn selection_keeps_text_after_last_slash() {
        assert_eq!(namespace_from_selection("namespace/foo"), "foo");
        assert_eq!(namespace_from_selection("foo"), "foo");
        assert_eq!(namespace_from_selection("a/b/c"), "c");
        assert_eq!(namespace_from_selection("namespace/"), "");
    }

    #[tokio::test]
    async fn pick_leaves_out_current_and_switches() {
        let (_dir, mut config) = kubeconfig("default").await;
        let ui = FakeUi {
            picked: Some("namespace/payments".to_owned()),
            ..Default::default()
        };

        let outcome = use_namespace(&mut config, &ui, &namespaces(), None, true)
            .await
            .unwrap();

        assert_eq!(outcome, NamespaceSwitch::Switched("payments".to_owned()));
        assert_eq!(
            *ui.offered.lock().unwrap(),
            vec!["namespace/kube-system", "namespace/payments"]
        );
        assert_eq!(
            *ui.toasts.lock().unwrap(),
            vec!["Switched to namespace payments"]
        );
        assert_eq!(config.current_namespace(), "payments");
    }

    #[tokio::test]
    async fn typing_the_current_namespace_changes_nothing() {
        let (_dir, mut config) = kubeconfig("payments").await;
        let ui = FakeUi {
            typed: Some("payments".to_owned()),
            ..Default::default()
        };

        let outcome = use_namespace(&mut config, &ui, &namespaces(), None, false)
            .await
            .unwrap();

        assert_eq!(outcome, NamespaceSwitch::Unchanged);
        assert!(ui.toasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn preferred_node_switches_without_prompting() {
        let (_dir, mut config) = kubeconfig("default").await;
        let ui = FakeUi::default();

        let outcome = use_namespace(&mut config, &ui, &[], Some("kube-system"), false)
            .await
            .unwrap();

        assert_eq!(outcome, NamespaceSwitch::Switched("kube-system".to_owned()));
        assert!(ui.offered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dismissed_picker_cancels() {
        let (_dir, mut config) = kubeconfig("default").await;
        let ui = FakeUi::default();

        let outcome = use_namespace(&mut config, &ui, &namespaces(), None, false)
            .await
            .unwrap();

        assert_eq!(outcome, NamespaceSwitch::Cancelled);
        assert_eq!(config.current_namespace(), "default");
    }
}
