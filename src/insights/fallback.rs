//! Static text used whenever the generative model isn't available.

pub const FOCUS_TIPS: [&str; 10] = [
    "Tip: Use the 2-minute rule - if a task takes less than 2 minutes, do it immediately.",
    "Tip: Try time-blocking - assign specific time slots to different activities.",
    "Tip: Turn off non-essential notifications during focus sessions.",
    "Tip: Take regular breaks to maintain mental energy throughout the day.",
    "Tip: Keep a distraction list - write down random thoughts to address later.",
    "Tip: Use the Pomodoro Technique - 25 minutes of focused work followed by 5-minute breaks.",
    "Tip: Try background music or white noise to improve concentration.",
    "Tip: Start each work session with 2 minutes of deep breathing to center yourself.",
    "Tip: Put your phone in another room or use airplane mode during deep work.",
    "Tip: Batch similar tasks together to minimize context switching.",
];

pub const UNCONFIGURED_FOCUS_TIP: &str =
    "Tip: Break large tasks into smaller, manageable chunks to maintain focus.";

pub const BREAK_ACTIVITIES: [&str; 10] = [
    "Step outside for fresh air and gentle stretching.",
    "Drink a glass of water and do some neck rolls.",
    "Look out the window and focus on distant objects for eye relief.",
    "Try 5 minutes of deep breathing or meditation.",
    "Take a short walk around your space or building.",
    "Do some shoulder shrugs and arm circles to release tension.",
    "Make a healthy snack or herbal tea mindfully.",
    "Read a few pages of an inspiring book.",
    "Do some light desk exercises or yoga poses.",
    "Listen to a calming song and practice gratitude.",
];

pub const UNCONFIGURED_BREAK_ACTIVITY: &str = "Try a 5-minute walk or some deep breathing exercises.";

/// Picks an entry by `seed`. Callers pass something that changes between calls, like the cycle
/// number or the day of the year.
pub fn pick(bank: &[&'static str], seed: usize) -> &'static str {
    bank.get(seed % bank.len().max(1)).copied().unwrap_or_default()
}

pub fn focus_tip(seed: usize) -> &'static str {
    pick(&FOCUS_TIPS, seed)
}

pub fn break_activity(seed: usize) -> &'static str {
    pick(&BREAK_ACTIVITIES, seed)
}
