use std::path::PathBuf;

/// `clarity-daemon` next to the given `clarity` executable.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("clarity-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
