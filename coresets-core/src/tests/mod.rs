mod test_offsets;
mod test_proposal;
mod test_stats;
