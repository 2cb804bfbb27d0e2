use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{ScenarioProfile, Session};

fn main() -> io::Result<()> {
    record_profile(ScenarioProfile::Morning)?;
    record_profile(ScenarioProfile::Offline)?;
    record_profile(ScenarioProfile::Faults)?;
    Ok(())
}

fn record_profile(profile: ScenarioProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    match profile {
        ScenarioProfile::Morning => record_morning(&mut session),
        ScenarioProfile::Offline => record_offline(&mut session),
        ScenarioProfile::Faults => record_faults(&mut session),
    }
}

/// Healthy morning: the second cycle lands inside the fire window, aligns,
/// and prints strip plus menu.
fn record_morning(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("status")?;
    let _ = session.handle_command("cycle 2")?;
    let _ = session.handle_command("log")?;
    Ok(())
}

/// Offline wake: the fetch fails, the pre-seeded cache arms the target,
/// and the engine fires from the cached value.
fn record_offline(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("status")?;
    let _ = session.handle_command("cycle")?;
    let _ = session.handle_command("net up")?;
    let _ = session.handle_command("arm +300")?;
    let _ = session.handle_command("cycle 2")?;
    Ok(())
}

/// Storage fault: the first failed mount raises the one-shot alert, the
/// following cycles stay silent, recovery re-arms the escalation.
fn record_faults(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("cycle 3")?;
    let _ = session.handle_command("sd ok")?;
    let _ = session.handle_command("cycle")?;
    let _ = session.handle_command("sd fail")?;
    let _ = session.handle_command("cycle")?;
    let _ = session.handle_command("status")?;
    Ok(())
}
