#[macro_use]
extern crate log;

mod shell;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    set_process_title();
    let mut s = shell::Shell::new();
    let code = s.run_interactive();
    std::process::exit(code);
}

#[cfg(target_os = "linux")]
fn set_process_title() {
    unsafe {
        libc::prctl(libc::PR_SET_NAME, b"relish\0".as_ptr());
    }
}

#[cfg(not(target_os = "linux"))]
fn set_process_title() {}
