//! Built-in configuration. A user config file is layered over this.

pub const DEFAULT_CONFIG: &str = r#"
[screen]
market = japan
preset = value
top = 20
reporting_currency = JPY
data_dir = data
concurrency = 4
fetch_timeout_ms = 10000

[stress]
portfolio = portfolio.csv
scenario = market-crash
concentration_threshold = 0.25
worst_k = 5

[preset.value]
description = Classic value: cheap on earnings and book
criteria = pe > 0, pe < 15, pb < 1.5
weights = pe:lower:0.4, pb:lower:0.3, dividend_yield:higher:0.2, roe:higher:0.1

[preset.high-dividend]
description = Income: yield first, with a sanity check on valuation
criteria = dividend_yield >= 3, pe > 0, pe < 20
weights = dividend_yield:higher:0.6, pe:lower:0.2, roe:higher:0.2

[preset.growth-value]
description = Profitable companies at a reasonable price
criteria = roe >= 10, pe > 0, pe < 20
weights = roe:higher:0.5, pe:lower:0.3, pb:lower:0.2

[preset.deep-value]
description = Deeply discounted against earnings and book
criteria = pe > 0, pe < 8, pb < 1
weights = pe:lower:0.5, pb:lower:0.5

[preset.quality]
description = High return on equity, large caps preferred
criteria = roe >= 15
weights = roe:higher:0.6, market_value:higher:0.2, pe:lower:0.2

[scenario.market-crash]
description = Broad equity sell-off
price = -20%

[scenario.rate-hike]
description = Policy rates up 100bp
rates = +100bp

[scenario.tech-selloff]
description = Technology de-rating
price = -5%
sector.technology = -25%
sector.communication services = -15%

[scenario.yen-appreciation]
description = Yen strengthens against major currencies
fx.usd = -10%
fx.sgd = -8%
fx.thb = -8%
fx.myr = -8%
fx.idr = -8%

[scenario.stagflation]
description = Rates up with falling equities and a weaker yen
price = -10%
rates = +200bp
fx.usd = +5%

[rate_sensitivity]
default = -2
real estate = -8
utilities = -6
financial services = 2
technology = -5
communication services = -3
consumer defensive = -2
energy = 0

[market.japan]
symbols = 7203.T, 6758.T, 8306.T, 8316.T, 9432.T, 9433.T, 9984.T, 6861.T, 8058.T, 8001.T, 4502.T, 7267.T, 2914.T, 6501.T, 8766.T

[market.us]
symbols = AAPL, MSFT, GOOGL, AMZN, META, NVDA, TSLA, AVGO, AMD, INTC, JPM, BAC, GS, BRK-B, V, MA, JNJ, UNH, PFE, LLY, PG, KO, PEP, WMT, COST, XOM, CVX, CAT, DIS, NFLX

[market.asean]
symbols = D05.SI, O39.SI, U11.SI, Z74.SI, PTT.BK, ADVANC.BK, 1155.KL, 1295.KL, BBCA.JK, BBRI.JK
"#;
