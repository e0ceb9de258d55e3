/// Classifies packages from the focus stream into user apps, system
/// surfaces that end a session, and system surfaces that leave it alone.
#[derive(Debug, Clone)]
pub struct PackageClassifier {
    own_package: String,
}

/// Exact-match list of system packages that are never treated as user apps.
const SYSTEM_PACKAGES: &[&str] = &[
    "android",
    "com.android.systemui",
    "com.google.android.inputmethod.latin",
    "com.google.android.inputmethod",
    "com.sec.android.inputmethod",
    "com.samsung.android.honeyboard",
    "com.samsung.android.svoiceime",
    "com.samsung.android.clipboardsaveservice",
    "com.swiftkey.swiftkeyconfigurator",
    "com.touchtype.swiftkey",
    "com.gboard",
    "com.samsung.android.sidegesturepad",
    "com.samsung.android.app.gestureservice",
    "com.samsung.android.onehandedmode",
    "com.samsung.android.edgepanel",
    "com.samsung.android.edge.feature",
    "com.samsung.android.service.edge",
    "com.samsung.android.service.peoplestripe",
    "com.samsung.android.service.gesture",
    "com.samsung.android.app.cocktailbarservice",
    "com.samsung.android.easysetup",
    "com.android.systemui.quickpanel",
    "com.android.systemui.qspanel",
    "com.android.systemui.statusbar",
    "com.android.systemui.notification",
    "com.google.android.documentsui",
    "com.android.documentsui",
    "com.google.android.providers.media.module",
    "com.sec.android.app.launcher",
    "com.google.android.apps.nexuslauncher",
    "com.android.launcher3",
    "com.samsung.android.app.aodservice",
    "com.samsung.android.bixby.agent",
    "com.samsung.android.bixby.wakeup",
    "com.samsung.android.visionintelligence",
    "com.samsung.android.app.settings.bixby",
    "com.samsung.android.app.routines",
    "com.samsung.android.app.reminder",
    "com.android.systemui.keyguard",
    "com.samsung.android.kidsinstaller",
    "com.samsung.android.app.screenrecorder",
    "com.samsung.android.service.livedrawing",
    "com.samsung.android.service.airview",
    "com.samsung.android.app.cameraedge",
    "com.samsung.android.service.aircommand",
];

/// Substring-match list of transient surfaces (keyboards, status bar,
/// notification shade) that may briefly take focus without meaning the
/// user left the tracked app.
const KEEPS_SESSION_ALIVE: &[&str] = &[
    "com.google.android.inputmethod",
    "com.sec.android.inputmethod",
    "com.samsung.android.honeyboard",
    "com.samsung.android.svoiceime",
    "com.samsung.android.sidegesturepad",
    "com.samsung.android.app.gestureservice",
    "com.samsung.android.edgepanel",
    "com.android.systemui",
    "com.android.systemui.statusbar",
    "com.android.systemui.notification",
    "com.android.systemui.quickpanel",
    "com.android.systemui.qspanel",
    "com.android.systemui.keyguard",
];

impl PackageClassifier {
    pub fn new(own_package: impl Into<String>) -> Self {
        Self {
            own_package: own_package.into(),
        }
    }

    /// True for system surfaces (and this app itself), which are never
    /// tracked as user sessions.
    pub fn is_system_package(&self, package_name: &str) -> bool {
        package_name == self.own_package || SYSTEM_PACKAGES.contains(&package_name)
    }

    /// True for system surfaces whose focus grab should not end the active
    /// session. Substring match on purpose: vendors ship many suffixed
    /// variants of these components.
    pub fn keeps_session_alive(&self, package_name: &str) -> bool {
        package_name.contains(self.own_package.as_str())
            || KEEPS_SESSION_ALIVE
                .iter()
                .any(|safe| package_name.contains(safe))
    }
}
