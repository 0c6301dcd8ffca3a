//! Fixed-field event lines emitted at info level.
//!
//! Every round and player event is logged as one line with the fields in a
//! fixed order so the output stays grep- and column-friendly. Fields that do
//! not apply to an event stay at zero; `id=*` marks broadcast events.

use log::info;

pub struct Event<'a> {
    pub event: &'a str,
    pub id: Option<i32>,
    pub m: f32,
    pub me: f32,
    pub n: u32,
    pub v: f32,
    pub bet: f32,
    pub payout: f32,
    pub player_profit: f32,
    pub house_profit: f32,
}

impl Default for Event<'_> {
    fn default() -> Self {
        Event {
            event: "",
            id: None,
            m: 0.0,
            me: 0.0,
            n: 0,
            v: 0.0,
            bet: 0.0,
            payout: 0.0,
            player_profit: 0.0,
            house_profit: 0.0,
        }
    }
}

impl Event<'_> {
    pub fn emit(&self) {
        let id = match self.id {
            Some(id) => id.to_string(),
            None => "*".to_string(),
        };
        info!(
            "event={} | id={} | m={:.2} | me={:.2} | N={} | V={:.2} | bet={:.2} | payout={:.2} | player_profit={:.2} | house_profit={:.2}",
            self.event,
            id,
            self.m,
            self.me,
            self.n,
            self.v,
            self.bet,
            self.payout,
            self.player_profit,
            self.house_profit,
        );
    }
}
