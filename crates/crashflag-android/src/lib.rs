//! crashflag-android: JNI surface for the native crash flag
//!
//! Exposes `initNativeCrashHandler()` and `getSignalStatus()` as native
//! methods of `com.lagradost.cloudstream3.utils.NativeCrashHandler`.
//!
//! On Android, ART routes `sigaction` through libsigchain, so the handler
//! installed here runs after the runtime has declined the signal (implicit
//! null checks and stack overflow probes never reach the flag).

use std::sync::Once;

use jni::objects::JClass;
use jni::sys::jint;
use jni::JNIEnv;

static LOGGER: Once = Once::new();

/// Route `log` output to logcat (stderr off Android). Runs once per process.
pub fn init_logging() {
    LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Info)
                .with_tag("crashflag"),
        );

        #[cfg(not(target_os = "android"))]
        {
            // Another logger may already be installed by the host
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            )
            .try_init();
        }
    });
}

/// Arm the SIGSEGV handler
///
/// Registration failures are logged and not surfaced to the managed caller.
pub fn init_native_crash_handler() {
    init_logging();
    match crashflag_core::install() {
        Ok(()) => log::info!("Native crash handler armed"),
        Err(e) => log::error!("Native crash handler not armed: {}", e),
    }
}

/// `0` when no fatal signal has been recorded, otherwise the signal number
pub fn signal_status() -> jint {
    crashflag_core::signal_status()
}

/// Fault the calling thread so the crash path can be exercised
#[cfg(all(unix, feature = "fault-injection"))]
pub fn trigger_native_crash() {
    if let Err(e) = crashflag_core::inject_fault(crashflag_core::Fault::InvalidAccess) {
        log::error!("Fault injection failed: {}", e);
    }
}

#[no_mangle]
pub extern "system" fn Java_com_lagradost_cloudstream3_utils_NativeCrashHandler_initNativeCrashHandler<
    'local,
>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    init_native_crash_handler();
}

#[no_mangle]
pub extern "system" fn Java_com_lagradost_cloudstream3_utils_NativeCrashHandler_getSignalStatus<
    'local,
>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jint {
    signal_status()
}

#[cfg(all(unix, feature = "fault-injection"))]
#[no_mangle]
pub extern "system" fn Java_com_lagradost_cloudstream3_utils_NativeCrashHandler_triggerNativeCrash<
    'local,
>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    trigger_native_crash();
}
