/*
each manager owns
1. the state the UI thread reads every frame
2. the work it hands to a background thread (see `task`)
3. a public api the composition root wires together
*/

pub mod task;
pub mod trace;
