//! Signal forwarding for running commands
//!
//! Each command runs as the leader of its own process group. Once
//! [`install`] has run, SIGINT, SIGTERM and SIGHUP sent to monora are passed
//! on to that group and remembered, so no further command is launched.

pub use imp::*;

#[cfg(unix)]
mod imp {
    use nix::libc;
    use nix::sys::signal::{self, killpg, SaFlags, SigAction, SigHandler, SigSet, Signal};
    use nix::unistd::{self, Pid};
    use std::io::{self, IsTerminal};
    use std::os::unix::process::CommandExt;
    use std::process::{Child, Command, ExitStatus};
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Mutex;

    /// Signals passed on to the running command
    const FORWARDED: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

    /// Process group of the running command, 0 when idle
    static CHILD_GROUP: AtomicI32 = AtomicI32::new(0);

    /// Number of the last signal received, 0 when none
    static RECEIVED: AtomicI32 = AtomicI32::new(0);

    static INSTALLED: AtomicBool = AtomicBool::new(false);
    static INSTALL_LOCK: Mutex<()> = Mutex::new(());

    extern "C" fn forward(signum: libc::c_int) {
        RECEIVED.store(signum, Ordering::SeqCst);

        let group = CHILD_GROUP.load(Ordering::SeqCst);
        if group > 0 {
            if let Ok(sig) = Signal::try_from(signum) {
                let _ = killpg(Pid::from_raw(group), sig);
            }
        }
    }

    /// Install the forwarding handlers; later calls do nothing
    pub fn install() -> nix::Result<()> {
        let _guard = INSTALL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        if INSTALLED.load(Ordering::SeqCst) {
            return Ok(());
        }

        let action = SigAction::new(
            SigHandler::Handler(forward),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for sig in FORWARDED {
            // SAFETY: the handler only touches atomics and calls killpg
            unsafe { signal::sigaction(sig, &action)? };
        }

        // Taking the terminal back from a command's group happens from the background
        // SAFETY: ignoring a signal installs no handler code
        unsafe { signal::signal(Signal::SIGTTOU, SigHandler::SigIgn)? };

        INSTALLED.store(true, Ordering::SeqCst);
        tracing::debug!("signal forwarding installed");
        Ok(())
    }

    /// Name of the signal that interrupted the run, if any
    pub fn received() -> Option<String> {
        match RECEIVED.load(Ordering::SeqCst) {
            0 => None,
            signum => Some(
                Signal::try_from(signum)
                    .map(|sig| sig.as_str().to_string())
                    .unwrap_or_else(|_| format!("signal {}", signum)),
            ),
        }
    }

    /// Whether monora's process group is the terminal's foreground group
    fn owns_terminal() -> bool {
        if !io::stdin().is_terminal() {
            return false;
        }
        // SAFETY: plain query on stdin
        let foreground = unsafe { libc::tcgetpgrp(libc::STDIN_FILENO) };
        foreground == unistd::getpgrp().as_raw()
    }

    /// A command running in its own process group
    #[derive(Debug)]
    pub struct GroupChild {
        child: Child,
        terminal: bool,
    }

    /// Spawn `command` as the leader of a new process group.
    ///
    /// With forwarding installed and monora in the foreground, the new group
    /// also gets the terminal until the command exits.
    pub fn spawn(command: &mut Command) -> io::Result<GroupChild> {
        let terminal = INSTALLED.load(Ordering::SeqCst) && owns_terminal();

        // SAFETY: only async-signal-safe calls run between fork and exec
        unsafe {
            command.pre_exec(move || {
                unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))?;
                if terminal {
                    libc::tcsetpgrp(libc::STDIN_FILENO, libc::getpid());
                }
                signal::signal(Signal::SIGTTOU, SigHandler::SigDfl)?;
                Ok(())
            });
        }

        let child = command.spawn()?;
        let group = child.id() as i32;

        // The child may not have reached its own setpgid yet
        let _ = unistd::setpgid(Pid::from_raw(group), Pid::from_raw(group));
        if terminal {
            // SAFETY: hands the terminal to a group we just created
            unsafe { libc::tcsetpgrp(libc::STDIN_FILENO, group) };
        }
        CHILD_GROUP.store(group, Ordering::SeqCst);

        // A signal that arrived before the group was recorded
        if let Ok(sig) = Signal::try_from(RECEIVED.load(Ordering::SeqCst)) {
            let _ = killpg(Pid::from_raw(group), sig);
        }

        Ok(GroupChild { child, terminal })
    }

    impl GroupChild {
        /// Process id of the group leader
        pub fn id(&self) -> u32 {
            self.child.id()
        }

        /// Wait for the command and take the terminal back
        pub fn wait(mut self) -> io::Result<ExitStatus> {
            let status = self.child.wait();
            CHILD_GROUP.store(0, Ordering::SeqCst);

            if self.terminal {
                // SAFETY: SIGTTOU is ignored once forwarding is installed
                unsafe { libc::tcsetpgrp(libc::STDIN_FILENO, libc::getpgrp()) };
            }

            status
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;
    use std::process::{Child, Command, ExitStatus};

    pub fn install() -> io::Result<()> {
        Ok(())
    }

    pub fn received() -> Option<String> {
        None
    }

    #[derive(Debug)]
    pub struct GroupChild {
        child: Child,
    }

    pub fn spawn(command: &mut Command) -> io::Result<GroupChild> {
        Ok(GroupChild {
            child: command.spawn()?,
        })
    }

    impl GroupChild {
        pub fn id(&self) -> u32 {
            self.child.id()
        }

        pub fn wait(mut self) -> io::Result<ExitStatus> {
            self.child.wait()
        }
    }
}
