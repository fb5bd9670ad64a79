mod test_full_negotiation;
mod test_idempotent_rejoin;
mod test_offer_race;
