mod alert_list;
mod fountain_detail;
mod fountain_list;
mod overview;
mod schedule_list;

pub use alert_list::AlertListView;
pub use fountain_detail::FountainDetailView;
pub use fountain_list::FountainListView;
pub use overview::OverviewView;
pub use schedule_list::ScheduleListView;
