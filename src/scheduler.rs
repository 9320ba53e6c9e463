use crate::application::{ServiceDependencies, loan::notify_overdue_loans};
use chrono::{DateTime, Days, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use std::time::Duration;
use tokio::task::JoinHandle;

/// `now`より後で最初に訪れる`hour`時0分0秒
///
/// `now`がちょうどその時刻の場合は翌日を返す。
pub fn next_run_after(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(at);

    if today > now {
        today
    } else {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDateTime::MAX)
    }
}

/// `now`から次の`hour`時の実行までの待ち時間
///
/// 壁時計の時刻をタイムゾーンで解決してから差を取るため、夏時間の切り替え日も
/// 実時間でちょうど次の実行時刻まで待つ。重複する時刻は早い方、存在しない時刻は
/// 1時間後ろにずらして扱う。
pub fn delay_until_next_run<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Duration {
    let tz = now.timezone();
    let next = next_run_after(now.naive_local(), hour);

    let at = tz.from_local_datetime(&next).earliest().or_else(|| {
        let shifted = next.checked_add_signed(TimeDelta::hours(1))?;
        tz.from_local_datetime(&shifted).earliest()
    });

    match at {
        Some(at) => (at - now.clone()).to_std().unwrap_or_default(),
        None => Duration::from_secs(60 * 60),
    }
}

/// 延滞通知を1日1回、ローカル時間の`hour`時に実行するタスクを起動する
///
/// 各実行は独立しており、失敗しても次の日の実行は続く。
pub fn spawn_overdue_notifier(deps: ServiceDependencies, hour: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = delay_until_next_run(&chrono::Local::now(), hour);

            tracing::info!(wait_secs = wait.as_secs(), "overdue notifier scheduled");
            tokio::time::sleep(wait).await;

            notify_overdue_loans(&deps).await;
        }
    })
}
